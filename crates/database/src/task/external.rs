//! Replaying changes committed by other connections.

use std::collections::BTreeSet;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use tracing::debug;
use trellis_storage::{Journal, TableDiff, TaskId};

use super::{abort, Task, TaskPriority, TransactionType, TARGET};
use crate::context::Context;
use crate::error::Result;

/// Applies diffs reported by the back store to the cache and indices.
///
/// The diffs are already durable, so nothing is written back. The task does
/// not check them against writes of read-write tasks still in flight: the
/// back store is assumed to have a single writer at a time.
pub struct ExternalChangeTask {
    id: TaskId,
    scope: BTreeSet<String>,
    diffs: Vec<TableDiff>,
}

impl ExternalChangeTask {
    pub fn new(ctx: &Context, diffs: Vec<TableDiff>) -> Self {
        let scope = diffs.iter().map(|d| d.name().to_string()).collect();
        Self {
            id: ctx.next_task_id(),
            scope,
            diffs,
        }
    }
}

impl Task for ExternalChangeTask {
    type Output = ();

    fn id(&self) -> TaskId {
        self.id
    }

    fn tx_type(&self) -> TransactionType {
        TransactionType::ReadWrite
    }

    fn scope(&self) -> &BTreeSet<String> {
        &self.scope
    }

    fn priority(&self) -> TaskPriority {
        TaskPriority::ExternalChange
    }

    fn exec(self, ctx: Rc<Context>) -> LocalBoxFuture<'static, Result<()>> {
        async move {
            let scope: Vec<&str> = self.scope.iter().map(String::as_str).collect();
            let mut journal = Journal::new(ctx.schema(), &scope);
            let applied = {
                let mut cache = ctx.cache().borrow_mut();
                let mut indices = ctx.indices().borrow_mut();
                self.diffs
                    .iter()
                    .try_for_each(|diff| journal.apply_diff(&mut cache, &mut indices, diff))
            };
            if let Err(e) = applied {
                abort(&ctx, self.id, journal);
                return Err(e.into());
            }
            for id in self.diffs.iter().flat_map(|d| d.added().keys()) {
                ctx.row_ids().observe(*id);
            }
            let diffs = journal.commit();
            debug!(target: TARGET, task = self.id, tables = diffs.len(), "Applied external change");
            Ok(())
        }
        .boxed_local()
    }
}
