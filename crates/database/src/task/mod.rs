//! Units of work the runner schedules.
//!
//! A task declares its transaction type and table scope up front. The runner
//! grants the matching locks before `exec` is called and releases them once
//! the returned future completes.

mod external;
mod query;
mod transfer;

pub use external::ExternalChangeTask;
pub use query::QueryTask;
pub use transfer::{DatabaseDump, ExportTask, ImportTask};

use std::collections::BTreeSet;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use tracing::debug;
use trellis_storage::{Journal, TableDiff, TaskId};

use crate::context::Context;
use crate::error::Result;

const TARGET: &str = "trellis::database::task";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionType {
    ReadOnly,
    ReadWrite,
}

/// Scheduling priority. Lower values run first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Export,
    Import,
    ObserverQuery,
    ExternalChange,
    UserQuery,
    Transaction,
}

impl TaskPriority {
    /// Numeric rank; tasks of equal rank keep their scheduling order.
    pub fn rank(self) -> u8 {
        match self {
            TaskPriority::Export | TaskPriority::Import | TaskPriority::ObserverQuery => 0,
            TaskPriority::ExternalChange => 1,
            TaskPriority::UserQuery | TaskPriority::Transaction => 2,
        }
    }

    /// Whether the task jumps ahead of user queries, clearing stale write
    /// reservations on its scope.
    pub fn is_urgent(self) -> bool {
        self.rank() < TaskPriority::UserQuery.rank()
    }
}

/// A unit of work run under table locks.
pub trait Task {
    type Output: 'static;

    fn id(&self) -> TaskId;

    fn tx_type(&self) -> TransactionType;

    /// Tables to lock, foreign-key neighbours included.
    fn scope(&self) -> &BTreeSet<String>;

    fn priority(&self) -> TaskPriority;

    /// Runs the task. The runner holds the task's locks until the future
    /// completes.
    fn exec(self, ctx: Rc<Context>) -> LocalBoxFuture<'static, Result<Self::Output>>;
}

/// Hands the journal's diffs to the back store and finishes the journal.
///
/// On failure every change the journal applied is rolled back.
pub(crate) async fn commit(
    ctx: &Context,
    task: TaskId,
    journal: Journal<'_>,
) -> Result<Vec<TableDiff>> {
    let diffs: Vec<TableDiff> = journal
        .scope()
        .filter_map(|table| journal.diff(table))
        .filter(|diff| !diff.is_empty())
        .cloned()
        .collect();
    if diffs.is_empty() {
        journal.commit();
        debug!(target: TARGET, task, "Committed without changes");
        return Ok(diffs);
    }

    let tx = ctx.back_store().create_tx(TransactionType::ReadWrite, diffs);
    match tx.commit().await {
        Ok(()) => {
            let diffs = journal.commit();
            debug!(target: TARGET, task, tables = diffs.len(), "Committed");
            Ok(diffs)
        }
        Err(e) => {
            ctx.rollback(journal);
            debug!(target: TARGET, task, "Aborted after back store failure");
            Err(e)
        }
    }
}

/// Rolls back a journal after a failed step.
pub(crate) fn abort(ctx: &Context, task: TaskId, journal: Journal<'_>) {
    ctx.rollback(journal);
    debug!(target: TARGET, task, "Aborted");
}
