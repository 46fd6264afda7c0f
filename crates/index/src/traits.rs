//! The `Index` trait all index implementations satisfy.

use crate::comparator::KeyComparator;
use crate::key::Key;
use crate::key_range::IndexRange;
use crate::stats::IndexStats;
use alloc::vec::Vec;
use core::fmt;
use trellis_core::RowId;

/// Error type for index operations.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexError {
    /// Attempted to insert an existing key into a unique index.
    DuplicateKey(Key),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::DuplicateKey(key) => {
                write!(f, "Duplicate key in unique index: {:?}", key)
            }
        }
    }
}

/// An index mapping keys to row ids.
///
/// Object safe so an index store can hold `Box<dyn Index>` of any flavour.
pub trait Index: fmt::Debug {
    /// Normalized name (`table.index`).
    fn name(&self) -> &str;

    /// Adds a row id under `key`. Unique indices reject existing keys.
    fn add(&mut self, key: Key, row_id: RowId) -> Result<(), IndexError>;

    /// Replaces every row id stored under `key` with `row_id`.
    fn set(&mut self, key: Key, row_id: RowId);

    /// Removes `row_id` from `key`, or the whole key when `row_id` is `None`.
    fn remove(&mut self, key: &Key, row_id: Option<RowId>);

    /// Row ids stored under `key`.
    fn get(&self, key: &Key) -> Vec<RowId>;

    /// Row ids whose keys fall in any of `ranges`, in index order.
    ///
    /// An empty slice scans the whole index. `skip` and `limit` apply to the
    /// combined result.
    fn get_range(
        &self,
        ranges: &[IndexRange],
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId>;

    /// Number of row ids a scan of `range` would return.
    fn cost(&self, range: Option<&IndexRange>) -> usize;

    /// Smallest key by value, with its row ids.
    fn min(&self) -> Option<(Key, Vec<RowId>)>;

    /// Largest key by value, with its row ids.
    fn max(&self) -> Option<(Key, Vec<RowId>)>;

    fn contains_key(&self, key: &Key) -> bool;

    fn clear(&mut self);

    fn stats(&self) -> &IndexStats;

    fn is_unique(&self) -> bool;

    fn comparator(&self) -> &KeyComparator;

    fn len(&self) -> usize {
        self.stats().total_rows()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
