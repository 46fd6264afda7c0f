//! Row structure for Trellis.
//!
//! A row is an id plus a payload keyed by column name. Rows are immutable once
//! stored; an update produces a new `Row` with the same id.

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::string::String;
use core::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a row.
pub type RowId = u64;

/// Column name to value mapping stored in a row.
pub type Payload = BTreeMap<String, Value>;

/// A dummy row ID used for rows that don't correspond to a DB entry
/// (e.g., the result of joining two rows).
pub const DUMMY_ROW_ID: RowId = u64::MAX;

/// Monotonic row id allocator owned by one database instance.
#[derive(Debug, Default)]
pub struct RowIdGenerator {
    next: AtomicU64,
}

impl RowIdGenerator {
    /// Creates a generator whose first id is `start`.
    pub fn new(start: RowId) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Gets the next unique row ID.
    pub fn next_id(&self) -> RowId {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Reserves `count` consecutive ids and returns the first one.
    pub fn reserve(&self, count: u64) -> RowId {
        self.next.fetch_add(count, Ordering::SeqCst)
    }

    /// Returns the id the next call to `next_id` will hand out.
    pub fn peek(&self) -> RowId {
        self.next.load(Ordering::SeqCst)
    }

    /// Makes sure ids handed out from now on are greater than `id`.
    ///
    /// Used after loading or importing rows that already carry ids.
    pub fn observe(&self, id: RowId) {
        if id != DUMMY_ROW_ID {
            self.next.fetch_max(id + 1, Ordering::SeqCst);
        }
    }
}

/// A row in a database table.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    id: RowId,
    payload: Payload,
}

impl Row {
    /// Creates a new row with the given ID and payload.
    pub fn new(id: RowId, payload: Payload) -> Self {
        Self { id, payload }
    }

    /// Creates a dummy row (for join results, aggregates, etc.).
    pub fn dummy(payload: Payload) -> Self {
        Self::new(DUMMY_ROW_ID, payload)
    }

    /// Starts building a row with the given id.
    pub fn builder(id: RowId) -> RowBuilder {
        RowBuilder {
            id,
            payload: Payload::new(),
        }
    }

    /// Returns the row ID.
    #[inline]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Returns a copy of this row carrying a different id.
    pub fn with_id(&self, id: RowId) -> Self {
        Self::new(id, self.payload.clone())
    }

    /// Returns a reference to the payload.
    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consumes the row and returns its payload.
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Gets the value stored under `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.payload.get(column)
    }

    /// Gets the value stored under `column`, treating a missing key as null.
    pub fn get_or_null(&self, column: &str) -> &Value {
        const NULL: &Value = &Value::Null;
        self.payload.get(column).unwrap_or(NULL)
    }

    /// Sets the value stored under `column`.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.payload.insert(column.into(), value);
    }

    /// Returns the number of columns in the payload.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns true if this is a dummy row.
    #[inline]
    pub fn is_dummy(&self) -> bool {
        self.id == DUMMY_ROW_ID
    }
}

/// Fluent constructor for rows, mostly used by tests and importers.
#[derive(Debug)]
pub struct RowBuilder {
    id: RowId,
    payload: Payload,
}

impl RowBuilder {
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(column.into(), value.into());
        self
    }

    pub fn build(self) -> Row {
        Row::new(self.id, self.payload)
    }
}
