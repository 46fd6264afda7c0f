//! Insert, update and delete executors.
//!
//! All writes go through the transaction's journal, which applies them to
//! the cache and indices right away and can roll them back.

use crate::context::{InsertContext, UpdateContext};
use crate::executor::{ExecContext, Relation};
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::schema::Table;
use trellis_core::{Error, Result, Row, Value};
use trellis_index::Key;
use trellis_storage::IndexStore;

/// Insert executor - gives each row a fresh row id, fills in
/// auto-increment primary keys and records the rows in the journal.
pub struct InsertExecutor<'q> {
    query: &'q InsertContext,
}

impl<'q> InsertExecutor<'q> {
    pub fn new(query: &'q InsertContext) -> Self {
        Self { query }
    }

    pub fn execute(&self, ctx: &mut ExecContext<'_, '_>) -> Result<Relation> {
        let schema = ctx.schema;
        let table = schema.table(&self.query.table)?;
        let mut next_key = AutoIncrement::new(table, ctx.indices);
        let rows: Vec<Rc<Row>> = self
            .query
            .values
            .iter()
            .map(|row| {
                let mut row = Row::new(ctx.row_ids.next_id(), row.payload().clone());
                if let Some(next_key) = next_key.as_mut() {
                    next_key.fill(&mut row);
                }
                Rc::new(row)
            })
            .collect();

        let (journal, cache, indices) = ctx.writer()?;
        if self.query.allow_replace {
            journal.insert_or_replace(cache, indices, table.name(), rows.clone())?;
        } else {
            journal.insert(cache, indices, table.name(), rows.clone())?;
        }
        Ok(Relation::from_rows(rows, table.name()))
    }
}

/// Assigns primary keys past the largest one the index has seen.
///
/// A missing, null or zero key counts as unassigned.
struct AutoIncrement {
    column: String,
    next: i64,
}

impl AutoIncrement {
    fn new(table: &Table, indices: &IndexStore) -> Option<Self> {
        let pk = table.primary_key().filter(|pk| pk.has_auto_increment())?;
        let column = pk.columns().first()?.name.clone();
        let max = indices
            .get(&pk.normalized_name())
            .and_then(|index| match index.stats().max_key_encountered() {
                Some(Key::Single(Value::Int64(n))) => Some(*n),
                _ => None,
            })
            .unwrap_or(0);
        Some(Self {
            column,
            next: max.saturating_add(1),
        })
    }

    fn fill(&mut self, row: &mut Row) {
        let unassigned = matches!(row.get(&self.column), None | Some(Value::Null) | Some(Value::Int64(0)));
        if unassigned {
            row.set(self.column.clone(), Value::Int64(self.next));
            self.next = self.next.saturating_add(1);
        }
    }
}

/// Update executor - applies the SET list to every input row.
pub struct UpdateExecutor<'q> {
    query: &'q UpdateContext,
}

impl<'q> UpdateExecutor<'q> {
    pub fn new(query: &'q UpdateContext) -> Self {
        Self { query }
    }

    pub fn execute(&self, ctx: &mut ExecContext<'_, '_>, input: &Relation) -> Result<Relation> {
        let mut rows = Vec::with_capacity(input.len());
        for entry in input.iter() {
            let mut row = entry.row.as_ref().clone();
            for (column, operand) in &self.query.set {
                let value = operand.value().cloned().ok_or_else(|| {
                    Error::invalid_query(format!("unbound parameter for column {}", column))
                })?;
                row.set(column.clone(), value);
            }
            rows.push(Rc::new(row));
        }
        let (journal, cache, indices) = ctx.writer()?;
        journal.update(cache, indices, &self.query.table.name, rows.clone())?;
        Ok(Relation::from_rows(rows, self.query.table.effective_name()))
    }
}

/// Delete executor - removes every input row.
pub struct DeleteExecutor<'t> {
    table: &'t str,
}

impl<'t> DeleteExecutor<'t> {
    pub fn new(table: &'t str) -> Self {
        Self { table }
    }

    pub fn execute(&self, ctx: &mut ExecContext<'_, '_>, input: Relation) -> Result<Relation> {
        let rows: Vec<Rc<Row>> = input.iter().map(|e| e.row.clone()).collect();
        let (journal, cache, indices) = ctx.writer()?;
        journal.remove(cache, indices, self.table, rows)?;
        Ok(input)
    }
}
