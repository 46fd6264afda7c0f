//! Trellis database runtime.
//!
//! Wraps the query engine in a connection: a `Context` holding the cache,
//! indexes and lock table of one schema, a `Runner` that schedules tasks
//! under table locks, and a `BackStore` that receives committed diffs.
//!
//! Tasks run on a caller-supplied `futures::task::LocalSpawn`, so the runtime
//! works with any single-threaded executor.

pub mod back_store;
pub mod context;
pub mod convert;
pub mod database;
pub mod error;
pub mod options;
pub mod runner;
pub mod task;

pub use back_store::{BackStore, ChangeHandler, MemoryBackStore, Tx};
pub use context::Context;
pub use database::{Database, Transaction};
pub use error::{DatabaseError, Result};
pub use options::ConnectOptions;
pub use runner::{Runner, TaskHandle};
pub use task::{
    DatabaseDump, ExportTask, ExternalChangeTask, ImportTask, QueryTask, Task, TaskPriority,
    TransactionType,
};
