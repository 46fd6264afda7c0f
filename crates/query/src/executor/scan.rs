//! Table and index scan executors.

use crate::executor::Relation;
use crate::optimizer::key_ranges;
use crate::predicate::{Predicate, TableRef};
use alloc::rc::Rc;
use alloc::vec::Vec;
use trellis_core::schema::Schema;
use trellis_core::{Error, Payload, Result, Row};
use trellis_storage::{Cache, IndexStore};

/// Table scan executor - reads every cached row of a table.
pub struct TableScanExecutor<'a> {
    table: &'a TableRef,
}

impl<'a> TableScanExecutor<'a> {
    pub fn new(table: &'a TableRef) -> Self {
        Self { table }
    }

    pub fn execute(&self, cache: &Cache) -> Relation {
        Relation::from_rows(cache.rows(&self.table.name), self.table.effective_name())
    }
}

/// Index scan executor - collects the row ids an index holds for the key
/// ranges of its predicates.
///
/// The output carries id-only placeholder rows; `RowIdFetchExecutor` turns
/// them into full rows.
pub struct IndexScanExecutor<'a> {
    table: &'a TableRef,
    index: &'a str,
    predicates: &'a [Predicate],
    limit: Option<usize>,
    skip: usize,
}

impl<'a> IndexScanExecutor<'a> {
    pub fn new(table: &'a TableRef, index: &'a str, predicates: &'a [Predicate]) -> Self {
        Self {
            table,
            index,
            predicates,
            limit: None,
            skip: 0,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>, skip: Option<usize>) -> Self {
        self.limit = limit;
        self.skip = skip.unwrap_or(0);
        self
    }

    pub fn execute(&self, schema: &Schema, indices: &IndexStore) -> Result<Relation> {
        let def = schema
            .table(&self.table.name)?
            .indices()
            .iter()
            .find(|d| d.normalized_name() == self.index)
            .ok_or_else(|| Error::index_not_found(self.index))?;
        let index = indices
            .get(self.index)
            .ok_or_else(|| Error::index_not_found(self.index))?;

        let ranges = key_ranges(def, self.table, self.predicates);
        let ids = if ranges.is_empty() {
            Vec::new()
        } else {
            index.get_range(&ranges, false, self.limit, self.skip)
        };
        let rows = ids
            .into_iter()
            .map(|id| Rc::new(Row::new(id, Payload::new())))
            .collect();
        Ok(Relation::from_rows(rows, self.table.effective_name()))
    }
}

/// Replaces the placeholder rows of an index scan with the cached rows.
pub struct RowIdFetchExecutor<'a> {
    table: &'a TableRef,
}

impl<'a> RowIdFetchExecutor<'a> {
    pub fn new(table: &'a TableRef) -> Self {
        Self { table }
    }

    pub fn execute(&self, cache: &Cache, input: &Relation) -> Relation {
        let rows = cache
            .get_many(&self.table.name, &input.row_ids())
            .into_iter()
            .flatten()
            .collect();
        Relation::from_rows(rows, self.table.effective_name())
    }
}
