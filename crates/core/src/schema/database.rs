//! Database-level schema: a named, versioned set of tables.

use super::constraint::ForeignKey;
use super::table::Table;
use crate::error::{Error, Result};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// A database schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    name: String,
    version: u32,
    tables: Vec<Table>,
}

impl Schema {
    /// Creates a schema, validating table name uniqueness and foreign keys.
    ///
    /// Every foreign key must reference an existing table through a column
    /// that is unique on its own in that table.
    pub fn new(name: impl Into<String>, version: u32, tables: Vec<Table>) -> Result<Self> {
        let schema = Self {
            name: name.into(),
            version,
            tables,
        };
        for (i, table) in schema.tables.iter().enumerate() {
            if schema.tables[..i].iter().any(|t| t.name() == table.name()) {
                return Err(Error::invalid_schema(format!(
                    "Duplicate table: {}",
                    table.name()
                )));
            }
            for fk in table.foreign_keys() {
                let parent = schema.table(&fk.parent_table).map_err(|_| {
                    Error::invalid_schema(format!(
                        "Foreign key {} references unknown table {}",
                        fk.name, fk.parent_table
                    ))
                })?;
                if !parent.is_unique_column(&fk.parent_column) {
                    return Err(Error::invalid_schema(format!(
                        "Foreign key {} must reference a unique column, got {}.{}",
                        fk.name, fk.parent_table, fk.parent_column
                    )));
                }
            }
        }
        Ok(schema)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// Tables referenced by `table`'s foreign keys.
    pub fn parent_tables(&self, table: &str) -> Vec<&Table> {
        let mut parents: Vec<&Table> = Vec::new();
        if let Ok(t) = self.table(table) {
            for fk in t.foreign_keys() {
                if let Ok(parent) = self.table(&fk.parent_table) {
                    if !parents.iter().any(|p| p.name() == parent.name()) {
                        parents.push(parent);
                    }
                }
            }
        }
        parents
    }

    /// Tables whose foreign keys reference `table`.
    pub fn child_tables(&self, table: &str) -> Vec<&Table> {
        self.tables
            .iter()
            .filter(|t| t.foreign_keys().iter().any(|fk| fk.parent_table == table))
            .collect()
    }

    /// Foreign keys of other tables that point at `table`.
    pub fn referencing_foreign_keys<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.tables
            .iter()
            .flat_map(|t| t.foreign_keys().iter())
            .filter(move |fk| fk.parent_table == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConstraintAction, TableBuilder};
    use crate::types::DataType;
    use alloc::vec;

    fn table(name: &str) -> TableBuilder {
        TableBuilder::new(name)
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("parent", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
    }

    #[test]
    fn test_parent_child_lookup() {
        let a = table("a").build().unwrap();
        let b = table("b")
            .add_foreign_key("fkA", "parent", "a", "id", ConstraintAction::Restrict)
            .unwrap()
            .build()
            .unwrap();
        let c = table("c")
            .add_foreign_key("fkB", "parent", "b", "id", ConstraintAction::Cascade)
            .unwrap()
            .build()
            .unwrap();
        let schema = Schema::new("db", 1, vec![a, b, c]).unwrap();

        let parents: Vec<&str> = schema.parent_tables("b").iter().map(|t| t.name()).collect();
        assert_eq!(parents, ["a"]);
        let children: Vec<&str> = schema.child_tables("b").iter().map(|t| t.name()).collect();
        assert_eq!(children, ["c"]);
        assert!(schema.parent_tables("a").is_empty());
        assert_eq!(schema.referencing_foreign_keys("a").count(), 1);
        assert!(matches!(schema.table("zzz"), Err(Error::TableNotFound { .. })));
    }

    #[test]
    fn test_invalid_foreign_keys() {
        let b = table("b")
            .add_foreign_key("fkA", "parent", "a", "id", ConstraintAction::Restrict)
            .unwrap()
            .build()
            .unwrap();
        assert!(Schema::new("db", 1, vec![b.clone()]).is_err());

        let a = table("a").build().unwrap();
        let bad = table("b")
            .add_foreign_key("fkA", "parent", "a", "parent", ConstraintAction::Restrict)
            .unwrap()
            .build()
            .unwrap();
        assert!(Schema::new("db", 1, vec![a.clone(), bad]).is_err());
        assert!(Schema::new("db", 1, vec![a.clone(), a]).is_err());
    }
}
