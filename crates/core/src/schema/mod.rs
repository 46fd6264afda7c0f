//! Schema module for Trellis.
//!
//! This module contains all schema-related definitions including columns,
//! tables, indices, foreign keys and the database-level `Schema`.

mod column;
mod constraint;
mod database;
mod index;
mod table;

pub use column::Column;
pub use constraint::{ConstraintAction, ForeignKey};
pub use database::Schema;
pub use index::{IndexDef, IndexedColumn, Order};
pub use table::{Table, TableBuilder, ROW_ID_INDEX_SUFFIX};
