//! Foreign key definitions for Trellis schema.

use alloc::string::String;

/// Action taken on child rows when the referenced parent row is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ConstraintAction {
    /// Reject the delete while child rows still reference the parent.
    #[default]
    Restrict,
    /// Delete the referencing child rows as well.
    Cascade,
}

/// Foreign key definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ForeignKey {
    pub name: String,
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
    pub parent_column: String,
    pub action: ConstraintAction,
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        child_table: impl Into<String>,
        child_column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            child_table: child_table.into(),
            child_column: child_column.into(),
            parent_table: parent_table.into(),
            parent_column: parent_column.into(),
            action: ConstraintAction::Restrict,
        }
    }

    pub fn action(mut self, action: ConstraintAction) -> Self {
        self.action = action;
        self
    }

    /// Name of the index created on the child column (`child.fkName`).
    pub fn child_index_name(&self) -> String {
        alloc::format!("{}.{}", self.child_table, self.name)
    }
}
