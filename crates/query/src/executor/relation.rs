//! Relation and RelationEntry types for query execution.

use crate::predicate::ColumnRef;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::{Payload, Row, RowId, Value};

static NULL: Value = Value::Null;

/// A row flowing between execution steps.
///
/// Rows read from a single table keep their plain column names. Rows produced
/// by a join carry `table.column` keys; `is_prefix_applied` tells which.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationEntry {
    pub row: Rc<Row>,
    is_prefix_applied: bool,
}

impl RelationEntry {
    pub fn new(row: Rc<Row>, is_prefix_applied: bool) -> Self {
        Self {
            row,
            is_prefix_applied,
        }
    }

    /// Entry for a row read straight from a table.
    pub fn from_row(row: Rc<Row>) -> Self {
        Self::new(row, false)
    }

    pub fn id(&self) -> RowId {
        self.row.id()
    }

    #[inline]
    pub fn is_prefix_applied(&self) -> bool {
        self.is_prefix_applied
    }

    /// Value of `column`, null when the entry has none.
    pub fn get_field(&self, column: &ColumnRef) -> &Value {
        if self.is_prefix_applied {
            self.row
                .get(&column.normalized_name())
                .unwrap_or(&NULL)
        } else {
            self.row.get_or_null(&column.name)
        }
    }

    /// Joins two entries into one whose payload is fully prefixed.
    pub fn combine(
        left: &RelationEntry,
        left_tables: &[String],
        right: &RelationEntry,
        right_tables: &[String],
    ) -> Self {
        let mut payload = Payload::new();
        left.write_prefixed(left_tables, &mut payload);
        right.write_prefixed(right_tables, &mut payload);
        Self::new(Rc::new(Row::dummy(payload)), true)
    }

    /// Pads `left` for an outer join without a match; the right side's
    /// columns are absent and read as null.
    pub fn combine_with_null(left: &RelationEntry, left_tables: &[String]) -> Self {
        let mut payload = Payload::new();
        left.write_prefixed(left_tables, &mut payload);
        Self::new(Rc::new(Row::dummy(payload)), true)
    }

    fn write_prefixed(&self, tables: &[String], out: &mut Payload) {
        if self.is_prefix_applied {
            out.extend(self.row.payload().iter().map(|(k, v)| (k.clone(), v.clone())));
        } else if let Some(table) = tables.first() {
            for (column, value) in self.row.payload() {
                out.insert(format!("{}.{}", table, column), value.clone());
            }
        }
    }
}

/// An ordered collection of entries from one or more source tables, plus the
/// aggregate results computed over it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Relation {
    pub entries: Vec<RelationEntry>,
    tables: Vec<String>,
    aggregations: BTreeMap<String, Value>,
}

impl Relation {
    pub fn new(entries: Vec<RelationEntry>, tables: Vec<String>) -> Self {
        Self {
            entries,
            tables,
            aggregations: BTreeMap::new(),
        }
    }

    /// A relation with no entries and no source tables.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps rows read from `table`.
    pub fn from_rows(rows: Vec<Rc<Row>>, table: &str) -> Self {
        let entries = rows.into_iter().map(RelationEntry::from_row).collect();
        Self::new(entries, alloc::vec![String::from(table)])
    }

    /// Source tables, in join order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationEntry> {
        self.entries.iter()
    }

    /// Whether entries carry `table.column` keys.
    pub fn is_prefix_applied(&self) -> bool {
        match self.entries.first() {
            Some(e) => e.is_prefix_applied(),
            None => self.tables.len() > 1,
        }
    }

    /// Same tables and aggregates, different entries.
    pub fn with_entries(&self, entries: Vec<RelationEntry>) -> Self {
        Self {
            entries,
            tables: self.tables.clone(),
            aggregations: self.aggregations.clone(),
        }
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.entries.iter().map(|e| e.id()).collect()
    }

    pub fn set_aggregation(&mut self, name: impl Into<String>, value: Value) {
        self.aggregations.insert(name.into(), value);
    }

    pub fn get_aggregation(&self, name: &str) -> Option<&Value> {
        self.aggregations.get(name)
    }

    pub fn has_aggregations(&self) -> bool {
        !self.aggregations.is_empty()
    }
}

impl IntoIterator for Relation {
    type Item = RelationEntry;
    type IntoIter = alloc::vec::IntoIter<RelationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
