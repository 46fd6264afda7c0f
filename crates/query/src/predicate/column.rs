//! Table and column references used by predicates and query contexts.

use alloc::format;
use alloc::string::String;

/// A table in a `FROM` clause, optionally aliased.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name rows of this table are tagged with: the alias if any.
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Reference to one of this table's columns.
    pub fn col(&self, column: impl Into<String>) -> ColumnRef {
        ColumnRef::new(self.effective_name(), column)
    }
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        TableRef::new(name)
    }
}

/// Reference to a column, qualified by the table's effective name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub name: String,
    /// Output name in projections.
    pub alias: Option<String>,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// `table.column`.
    pub fn normalized_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }

    /// Same column, ignoring aliases.
    pub fn same_column(&self, other: &ColumnRef) -> bool {
        self.table == other.table && self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_name() {
        let t = TableRef::new("employee");
        assert_eq!(t.effective_name(), "employee");
        let e = TableRef::new("employee").alias("e");
        assert_eq!(e.effective_name(), "e");
        assert_eq!(e.col("salary").normalized_name(), "e.salary");
    }

    #[test]
    fn test_same_column_ignores_alias() {
        let a = ColumnRef::new("t", "c");
        let b = ColumnRef::new("t", "c").alias("x");
        assert!(a.same_column(&b));
        assert_ne!(a, b);
    }
}
