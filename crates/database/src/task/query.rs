//! Tasks running user queries.

use std::collections::BTreeSet;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use trellis_query::{PhysicalPlan, QueryContext, Relation};
use trellis_storage::{Journal, TaskId};

use super::{abort, commit, Task, TaskPriority, TransactionType};
use crate::context::Context;
use crate::error::Result;

/// One or more queries run atomically under a single journal.
///
/// Plans are compiled when the task is created, so usage errors surface
/// before anything is scheduled. A read-write task that fails part way
/// leaves no trace: every earlier write of the task is rolled back.
pub struct QueryTask {
    id: TaskId,
    tx_type: TransactionType,
    scope: BTreeSet<String>,
    priority: TaskPriority,
    queries: Vec<(QueryContext, PhysicalPlan)>,
}

impl QueryTask {
    pub fn new(ctx: &Context, queries: Vec<QueryContext>, priority: TaskPriority) -> Result<Self> {
        let mut scope = BTreeSet::new();
        let mut compiled = Vec::with_capacity(queries.len());
        for query in queries {
            scope.extend(ctx.scope(&query)?);
            let plan = ctx.compile(&query)?;
            compiled.push((query, plan));
        }
        let tx_type = if compiled.iter().all(|(q, _)| q.is_read_only()) {
            TransactionType::ReadOnly
        } else {
            TransactionType::ReadWrite
        };
        Ok(Self {
            id: ctx.next_task_id(),
            tx_type,
            scope,
            priority,
            queries: compiled,
        })
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl Task for QueryTask {
    type Output = Vec<Relation>;

    fn id(&self) -> TaskId {
        self.id
    }

    fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    fn scope(&self) -> &BTreeSet<String> {
        &self.scope
    }

    fn priority(&self) -> TaskPriority {
        self.priority
    }

    fn exec(self, ctx: Rc<Context>) -> LocalBoxFuture<'static, Result<Vec<Relation>>> {
        async move {
            if self.tx_type == TransactionType::ReadOnly {
                return self
                    .queries
                    .iter()
                    .map(|(query, plan)| ctx.exec(plan, query, None))
                    .collect();
            }

            let scope: Vec<&str> = self.scope.iter().map(String::as_str).collect();
            let mut journal = Journal::new(ctx.schema(), &scope);
            let mut results = Vec::with_capacity(self.queries.len());
            for (query, plan) in &self.queries {
                match ctx.exec(plan, query, Some(&mut journal)) {
                    Ok(relation) => results.push(relation),
                    Err(e) => {
                        abort(&ctx, self.id, journal);
                        return Err(e);
                    }
                }
            }
            commit(&ctx, self.id, journal).await?;
            Ok(results)
        }
        .boxed_local()
    }
}
