//! Constraint checks run by the journal before a row reaches the indices.
//!
//! Primary key and unique constraints are enforced by the unique indices
//! themselves; this module covers not-null, column types and foreign keys.

use crate::index_store::IndexStore;
use alloc::format;
use trellis_core::schema::{ForeignKey, IndexDef, Schema, Table};
use trellis_core::{Error, Result, Row, Value};
use trellis_index::Key;

/// Stateless constraint checker.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Rejects null (or missing) values in non-nullable columns.
    pub fn check_not_null(table: &Table, row: &Row) -> Result<()> {
        for column in table.not_nullable() {
            if row.get_or_null(column.name()).is_null() {
                return Err(Error::null_constraint(format!(
                    "{}.{}",
                    table.name(),
                    column.name()
                )));
            }
        }
        Ok(())
    }

    /// Rejects values whose type does not match the column's declared type.
    pub fn check_types(table: &Table, row: &Row) -> Result<()> {
        for column in table.columns() {
            let value = row.get_or_null(column.name());
            if !value.is_compatible(column.data_type()) {
                if let Some(got) = value.data_type() {
                    return Err(Error::type_mismatch(
                        format!("{}.{}", table.name(), column.name()),
                        column.data_type(),
                        got,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Every non-null foreign key value of `row` must exist in its parent.
    pub fn check_references_exist(
        schema: &Schema,
        indices: &IndexStore,
        table: &Table,
        row: &Row,
    ) -> Result<()> {
        for fk in table.foreign_keys() {
            let value = row.get_or_null(&fk.child_column);
            Self::check_reference(schema, indices, fk, value)?;
        }
        Ok(())
    }

    /// Like `check_references_exist`, limited to foreign key columns whose
    /// value differs between `old` and `new`.
    pub fn check_changed_references_exist(
        schema: &Schema,
        indices: &IndexStore,
        table: &Table,
        old: &Row,
        new: &Row,
    ) -> Result<()> {
        for fk in table.foreign_keys() {
            let value = new.get_or_null(&fk.child_column);
            if old.get_or_null(&fk.child_column) != value {
                Self::check_reference(schema, indices, fk, value)?;
            }
        }
        Ok(())
    }

    fn check_reference(
        schema: &Schema,
        indices: &IndexStore,
        fk: &ForeignKey,
        value: &Value,
    ) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let parent = schema.table(&fk.parent_table)?;
        let def = parent_index(parent, &fk.parent_column).ok_or_else(|| {
            Error::index_not_found(format!("{}.{}", fk.parent_table, fk.parent_column))
        })?;
        let name = def.normalized_name();
        let index = indices
            .get(&name)
            .ok_or_else(|| Error::index_not_found(name.as_str()))?;
        if index.contains_key(&Key::Single(value.clone())) {
            Ok(())
        } else {
            Err(Error::foreign_key(
                &fk.name,
                format!("{} does not exist in {}.{}", value, fk.parent_table, fk.parent_column),
            ))
        }
    }

    /// Returns whether any child row references `row` through `fk`.
    pub fn is_referenced(indices: &IndexStore, fk: &ForeignKey, row: &Row) -> Result<bool> {
        let value = row.get_or_null(&fk.parent_column);
        if value.is_null() {
            return Ok(false);
        }
        let name = fk.child_index_name();
        let index = indices
            .get(&name)
            .ok_or_else(|| Error::index_not_found(name.as_str()))?;
        Ok(index.contains_key(&Key::Single(value.clone())))
    }

    /// Fails when a restricting foreign key still references `row`.
    pub fn check_not_referenced(
        schema: &Schema,
        indices: &IndexStore,
        table: &Table,
        row: &Row,
    ) -> Result<()> {
        for fk in schema.referencing_foreign_keys(table.name()) {
            if Self::is_referenced(indices, fk, row)? {
                return Err(Error::foreign_key(
                    &fk.name,
                    format!(
                        "{} is still referenced by {}.{}",
                        row.get_or_null(&fk.parent_column),
                        fk.child_table,
                        fk.child_column
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// The unique single-column index a foreign key's parent column is backed by.
fn parent_index<'a>(parent: &'a Table, column: &str) -> Option<&'a IndexDef> {
    parent
        .indices()
        .iter()
        .find(|i| i.is_unique() && i.is_single_column() && i.columns()[0].name == column)
}
