//! Trellis Storage - the mutable state a query engine reads and writes.
//!
//! - `Cache`: committed rows per table, keyed by row id
//! - `IndexStore`: every index of every table, built from the schema
//! - `Journal`: per-transaction write path with constraint checks and rollback
//! - `ConstraintChecker`: not-null, type and foreign key validation
//! - `LockManager`: table-scoped reservation/shared/exclusive locks
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use trellis_core::schema::{Schema, TableBuilder};
//! use trellis_core::{DataType, Row};
//! use trellis_storage::{Cache, IndexStore, Journal};
//!
//! let users = TableBuilder::new("users")
//!     .unwrap()
//!     .add_column("id", DataType::Int64)
//!     .unwrap()
//!     .add_column("name", DataType::String)
//!     .unwrap()
//!     .add_primary_key(&["id"], false)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let schema = Schema::new("app", 1, vec![users]).unwrap();
//!
//! let mut cache = Cache::new();
//! let mut indices = IndexStore::new();
//! indices.init(&schema);
//!
//! let mut journal = Journal::new(&schema, &["users"]);
//! let row = Row::builder(1).set("id", 1i64).set("name", "Alice").build();
//! journal.insert(&mut cache, &mut indices, "users", vec![Rc::new(row)]).unwrap();
//! let diffs = journal.commit();
//!
//! assert_eq!(cache.count(Some("users")), 1);
//! assert_eq!(diffs[0].added().len(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod cache;
pub mod constraint;
pub mod index_store;
pub mod journal;
pub mod lock;

pub use cache::Cache;
pub use constraint::ConstraintChecker;
pub use index_store::{key_of_row, IndexStore};
pub use journal::{Journal, TableDiff};
pub use lock::{LockManager, LockType, TaskId};
