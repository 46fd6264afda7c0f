//! Error types for Trellis.

use crate::types::DataType;
use crate::value::Value;
use alloc::string::String;
use core::fmt;

/// Result type alias for Trellis operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Trellis operations.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Type mismatch error.
    TypeMismatch {
        column: String,
        expected: DataType,
        got: DataType,
    },
    /// Null constraint violation.
    NullConstraint {
        column: String,
    },
    /// Unique (or primary key) constraint violation.
    UniqueConstraint {
        index: String,
        value: Value,
    },
    /// Invalid schema definition.
    InvalidSchema {
        message: String,
    },
    /// Malformed query construction.
    InvalidQuery {
        message: String,
    },
    /// Column not found.
    ColumnNotFound {
        table: String,
        column: String,
    },
    /// Table not found.
    TableNotFound {
        name: String,
    },
    /// Index not found.
    IndexNotFound {
        index: String,
    },
    /// The operation requires a primary key the table does not declare.
    MissingPrimaryKey {
        table: String,
    },
    /// Foreign key constraint violation.
    ForeignKeyViolation {
        constraint: String,
        message: String,
    },
    /// Import rejected (non-empty database, schema name or version mismatch).
    Import {
        message: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeMismatch {
                column,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Type mismatch on column {}: expected {:?}, got {:?}",
                    column, expected, got
                )
            }
            Error::NullConstraint { column } => {
                write!(f, "Null constraint violation on column: {}", column)
            }
            Error::UniqueConstraint { index, value } => {
                write!(
                    f,
                    "Unique constraint violation on index {}: {:?}",
                    index, value
                )
            }
            Error::InvalidSchema { message } => {
                write!(f, "Invalid schema: {}", message)
            }
            Error::InvalidQuery { message } => {
                write!(f, "Invalid query: {}", message)
            }
            Error::ColumnNotFound { table, column } => {
                write!(f, "Column {} not found in table {}", column, table)
            }
            Error::TableNotFound { name } => {
                write!(f, "Table not found: {}", name)
            }
            Error::IndexNotFound { index } => {
                write!(f, "Index not found: {}", index)
            }
            Error::MissingPrimaryKey { table } => {
                write!(f, "Table {} has no primary key", table)
            }
            Error::ForeignKeyViolation {
                constraint,
                message,
            } => {
                write!(f, "Foreign key violation ({}): {}", constraint, message)
            }
            Error::Import { message } => {
                write!(f, "Import failed: {}", message)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl core::error::Error for Error {}

impl Error {
    /// Creates a type mismatch error.
    pub fn type_mismatch(column: impl Into<String>, expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch {
            column: column.into(),
            expected,
            got,
        }
    }

    /// Creates a null constraint error.
    pub fn null_constraint(column: impl Into<String>) -> Self {
        Error::NullConstraint {
            column: column.into(),
        }
    }

    /// Creates a unique constraint error.
    pub fn unique_constraint(index: impl Into<String>, value: Value) -> Self {
        Error::UniqueConstraint {
            index: index.into(),
            value,
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates an index not found error.
    pub fn index_not_found(index: impl Into<String>) -> Self {
        Error::IndexNotFound {
            index: index.into(),
        }
    }

    /// Creates a missing primary key error.
    pub fn missing_primary_key(table: impl Into<String>) -> Self {
        Error::MissingPrimaryKey {
            table: table.into(),
        }
    }

    /// Creates a foreign key violation error.
    pub fn foreign_key(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ForeignKeyViolation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Creates an import error.
    pub fn import(message: impl Into<String>) -> Self {
        Error::Import {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for data-integrity errors raised while a task executes.
    ///
    /// Everything else is a usage or schema error that the caller has to fix
    /// before scheduling the query again.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Error::TypeMismatch { .. }
                | Error::NullConstraint { .. }
                | Error::UniqueConstraint { .. }
                | Error::ForeignKeyViolation { .. }
                | Error::Import { .. }
        )
    }
}
