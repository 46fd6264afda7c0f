//! Error type of the database runtime.

use thiserror::Error;
use trellis_storage::TaskId;

/// Errors surfaced by the runtime and by task results.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Usage, schema or data-integrity error from the engine.
    #[error(transparent)]
    Core(#[from] trellis_core::Error),
    /// The backing store failed to persist or load data.
    #[error("back store error: {0}")]
    BackStore(String),
    /// The task was dropped before it produced a result.
    #[error("task {task} was cancelled")]
    Cancelled { task: TaskId },
    #[error("database is closed")]
    Closed,
}

impl DatabaseError {
    /// Whether the error is a constraint or import failure raised while a
    /// task ran, as opposed to a usage or service error.
    pub fn is_integrity(&self) -> bool {
        matches!(self, DatabaseError::Core(e) if e.is_integrity())
    }
}

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;
