//! Table definition for Trellis schema.

use super::column::Column;
use super::constraint::{ConstraintAction, ForeignKey};
use super::index::{IndexDef, IndexedColumn, Order};
use crate::error::{Error, Result};
use crate::types::DataType;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Suffix of the implicit row-id index every table carries (`table.#`).
pub const ROW_ID_INDEX_SUFFIX: &str = "#";

/// A table definition in the database schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    /// Secondary indices followed by the primary key, if any.
    indices: Vec<IndexDef>,
    primary_key: Option<IndexDef>,
    foreign_keys: Vec<ForeignKey>,
}

impl Table {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns every declared index, the primary key included.
    #[inline]
    pub fn indices(&self) -> &[IndexDef] {
        &self.indices
    }

    #[inline]
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Like `get_column`, but reports a missing column as an error.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.get_column(name)
            .ok_or_else(|| Error::column_not_found(&self.name, name))
    }

    /// Gets an index by its short name.
    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indices.iter().find(|i| i.name() == name)
    }

    pub fn primary_key(&self) -> Option<&IndexDef> {
        self.primary_key.as_ref()
    }

    /// Name of this table's row-id index.
    pub fn row_id_index_name(&self) -> String {
        format!("{}.{}", self.name, ROW_ID_INDEX_SUFFIX)
    }

    /// Returns the columns that reject null.
    pub fn not_nullable(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_nullable())
    }

    /// Returns whether `column` is covered on its own by a unique index.
    pub fn is_unique_column(&self, column: &str) -> bool {
        self.indices
            .iter()
            .any(|i| i.is_unique() && i.is_single_column() && i.columns()[0].name == column)
    }
}

/// Builder for creating table definitions.
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    indices: Vec<IndexDef>,
    primary_key: Option<IndexDef>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            indices: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        })
    }

    /// Adds a column to the table.
    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(Error::invalid_schema(format!(
                "Column already exists: {}",
                name
            )));
        }
        self.columns.push(Column::new(name, data_type));
        Ok(self)
    }

    /// Marks existing columns as nullable.
    pub fn add_nullable(mut self, columns: &[&str]) -> Self {
        for name in columns {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name() == *name) {
                *col = col.clone().nullable(true);
            }
        }
        self
    }

    /// Sets the primary key, named `pk<Table>`.
    ///
    /// `auto_increment` only applies to a single integer column.
    pub fn add_primary_key(mut self, columns: &[&str], auto_increment: bool) -> Result<Self> {
        if self.primary_key.is_some() {
            return Err(Error::invalid_schema(format!(
                "Primary key already defined for {}",
                self.name
            )));
        }
        let auto_increment = auto_increment && columns.len() == 1;
        let indexed = self.indexed_columns(columns.iter().map(|c| (*c, Order::Asc)))?;
        if auto_increment {
            let col = self.column_ref(columns[0])?;
            if !col.data_type().is_integer() {
                return Err(Error::invalid_schema(
                    "Auto-increment requires integer type",
                ));
            }
        }
        let indexed = indexed
            .into_iter()
            .map(|c| c.auto_increment(auto_increment))
            .collect();
        let pk_name = format!("pk{}", capitalize(&self.name));
        self.primary_key = Some(IndexDef::new(pk_name, &self.name, indexed).unique(true));
        Ok(self)
    }

    /// Adds a unique constraint, backed by a unique index.
    pub fn add_unique(self, name: impl Into<String>, columns: &[&str]) -> Result<Self> {
        self.add_index(name, columns, true)
    }

    /// Adds an ascending index over `columns`.
    pub fn add_index(
        self,
        name: impl Into<String>,
        columns: &[&str],
        unique: bool,
    ) -> Result<Self> {
        let ordered: Vec<(&str, Order)> = columns.iter().map(|c| (*c, Order::Asc)).collect();
        self.add_ordered_index(name, &ordered, unique)
    }

    /// Adds an index with an explicit order per column.
    pub fn add_ordered_index(
        mut self,
        name: impl Into<String>,
        columns: &[(&str, Order)],
        unique: bool,
    ) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        if self.indices.iter().any(|i| i.name() == name) {
            return Err(Error::invalid_schema(format!(
                "Index already exists: {}",
                name
            )));
        }
        let indexed = self.indexed_columns(columns.iter().copied())?;
        self.indices
            .push(IndexDef::new(name, &self.name, indexed).unique(unique));
        Ok(self)
    }

    /// Adds a foreign key constraint plus an index on the child column.
    pub fn add_foreign_key(
        mut self,
        name: impl Into<String>,
        child_column: &str,
        parent_table: &str,
        parent_column: &str,
        action: ConstraintAction,
    ) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        self.column_ref(child_column)?;

        let fk = ForeignKey::new(&name, &self.name, child_column, parent_table, parent_column)
            .action(action);
        self.foreign_keys.push(fk);

        let is_unique = self
            .primary_key
            .as_ref()
            .map(|pk| pk.is_single_column() && pk.columns()[0].name == child_column)
            .unwrap_or(false);
        self.add_index(name, &[child_column], is_unique)
    }

    /// Builds the table definition.
    pub fn build(self) -> Result<Table> {
        if self.columns.is_empty() {
            return Err(Error::invalid_schema(format!(
                "Table {} has no columns",
                self.name
            )));
        }
        let mut indices = self.indices;
        if let Some(pk) = &self.primary_key {
            indices.push(pk.clone());
        }
        Ok(Table {
            name: self.name,
            columns: self.columns,
            indices,
            primary_key: self.primary_key,
            foreign_keys: self.foreign_keys,
        })
    }

    fn column_ref(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| Error::column_not_found(&self.name, name))
    }

    fn indexed_columns<'a>(
        &self,
        columns: impl Iterator<Item = (&'a str, Order)>,
    ) -> Result<Vec<IndexedColumn>> {
        let mut indexed = Vec::new();
        for (name, order) in columns {
            let column = self.column_ref(name)?;
            if !column.is_indexable() {
                return Err(Error::invalid_schema(format!(
                    "Column is not indexable: {}",
                    name
                )));
            }
            indexed.push(IndexedColumn::new(name).order(order));
        }
        if indexed.is_empty() {
            return Err(Error::invalid_schema("Index needs at least one column"));
        }
        Ok(indexed)
    }
}

/// Validates a name follows naming rules.
fn check_naming_rules(name: &str) -> Result<()> {
    let Some(first) = name.chars().next() else {
        return Err(Error::invalid_schema("Name cannot be empty"));
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::invalid_schema(format!(
            "Name must start with letter or underscore: {}",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::invalid_schema(format!(
            "Name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        TableBuilder::new("users")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("email", DataType::String)
            .unwrap()
            .add_nullable(&["email"])
            .add_primary_key(&["id"], true)
            .unwrap()
            .add_unique("uqEmail", &["email"])
            .unwrap()
            .add_ordered_index("idxName", &[("name", Order::Desc)], false)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_table_builder() {
        let table = users();
        assert_eq!(table.name(), "users");
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.indices().len(), 3);
        assert_eq!(table.row_id_index_name(), "users.#");

        let pk = table.primary_key().unwrap();
        assert_eq!(pk.name(), "pkUsers");
        assert!(pk.has_auto_increment());
        assert!(table.indices().iter().any(|i| i.name() == "pkUsers"));
        assert_eq!(
            table.get_index("idxName").unwrap().columns()[0].order,
            Order::Desc
        );
    }

    #[test]
    fn test_not_nullable_and_unique() {
        let table = users();
        let names: Vec<&str> = table.not_nullable().map(|c| c.name()).collect();
        assert_eq!(names, ["id", "name"]);
        assert!(table.is_unique_column("email"));
        assert!(table.is_unique_column("id"));
        assert!(!table.is_unique_column("name"));
    }

    #[test]
    fn test_invalid_definitions() {
        assert!(TableBuilder::new("").is_err());
        assert!(TableBuilder::new("t")
            .unwrap()
            .add_column("123invalid", DataType::Int64)
            .is_err());
        assert!(TableBuilder::new("t")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("id", DataType::Int64)
            .is_err());
        assert!(TableBuilder::new("t")
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_primary_key(&["name"], true)
            .is_err());
        assert!(TableBuilder::new("t")
            .unwrap()
            .add_column("data", DataType::Bytes)
            .unwrap()
            .add_index("idxData", &["data"], false)
            .is_err());
    }

    #[test]
    fn test_foreign_key_adds_index() {
        let table = TableBuilder::new("orders")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("user_id", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_foreign_key("fkUser", "user_id", "users", "id", ConstraintAction::Cascade)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(table.foreign_keys().len(), 1);
        let idx = table.get_index("fkUser").unwrap();
        assert!(!idx.is_unique());
        assert_eq!(idx.columns()[0].name, "user_id");
    }
}
