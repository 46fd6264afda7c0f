//! Task runner.
//!
//! The runner keeps a queue of pending tasks ordered by priority, stable
//! within a priority. Whenever a task is scheduled or finishes, the queue is
//! scanned front to back and every task whose whole scope can be locked is
//! spawned. Read-only tasks reserve their scope for reading and then take
//! shared locks; read-write tasks reserve it for writing and then escalate to
//! exclusive locks. A task keeps its locks until its future completes.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as PollContext, Poll};

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::{debug, trace, warn};
use trellis_storage::{LockManager, LockType, TaskId};

use crate::context::Context;
use crate::error::{DatabaseError, Result};
use crate::task::{Task, TaskPriority, TransactionType};

const TARGET: &str = "trellis::database::runner";

type Job = Box<dyn FnOnce(Rc<Context>) -> LocalBoxFuture<'static, ()>>;

struct Pending {
    id: TaskId,
    tx_type: TransactionType,
    scope: Vec<String>,
    priority: TaskPriority,
    job: Job,
}

/// Schedules tasks against the table locks of one connection.
pub struct Runner {
    context: Rc<Context>,
    spawner: Box<dyn LocalSpawn>,
    queue: RefCell<VecDeque<Pending>>,
    running: Cell<usize>,
    closed: Cell<bool>,
}

impl Runner {
    pub fn new(context: Rc<Context>, spawner: impl LocalSpawn + 'static) -> Rc<Self> {
        Rc::new(Self {
            context,
            spawner: Box::new(spawner),
            queue: RefCell::new(VecDeque::new()),
            running: Cell::new(0),
            closed: Cell::new(false),
        })
    }

    pub fn context(&self) -> &Rc<Context> {
        &self.context
    }

    /// Number of tasks waiting for their locks.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Number of tasks spawned and not yet finished.
    pub fn running(&self) -> usize {
        self.running.get()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Queues `task` and returns a handle resolving to its result.
    ///
    /// Tasks more urgent than user queries go ahead of them and clear any
    /// write reservation left on their scope.
    pub fn schedule<T>(self: &Rc<Self>, task: T) -> TaskHandle<T::Output>
    where
        T: Task + 'static,
    {
        let id = task.id();
        let (sender, receiver) = oneshot::channel();
        let handle = TaskHandle { id, receiver };
        if self.closed.get() {
            let _ = sender.send(Err(DatabaseError::Closed));
            return handle;
        }

        let tx_type = task.tx_type();
        let priority = task.priority();
        let scope: Vec<String> = task.scope().iter().cloned().collect();
        let job: Job = Box::new(move |ctx| {
            async move {
                let result = task.exec(ctx).await;
                if let Err(e) = &result {
                    warn!(target: TARGET, task = id, error = %e, "Task failed");
                }
                let _ = sender.send(result);
            }
            .boxed_local()
        });
        debug!(target: TARGET, task = id, ?tx_type, ?priority, ?scope, "Scheduled task");

        if priority.is_urgent() {
            self.context.locks().borrow_mut().clear_reserved_locks(&scope);
        }
        {
            let mut queue = self.queue.borrow_mut();
            let position = queue
                .iter()
                .position(|p| p.priority.rank() > priority.rank())
                .unwrap_or(queue.len());
            queue.insert(
                position,
                Pending {
                    id,
                    tx_type,
                    scope,
                    priority,
                    job,
                },
            );
        }
        self.consume_pending();
        handle
    }

    /// Spawns every queued task whose locks can be granted now.
    pub fn consume_pending(self: &Rc<Self>) {
        let granted = {
            let mut queue = self.queue.borrow_mut();
            let mut locks = self.context.locks().borrow_mut();
            let mut granted = Vec::new();
            let mut i = 0;
            while i < queue.len() {
                if acquire(&mut locks, &queue[i]) {
                    granted.extend(queue.remove(i));
                } else {
                    i += 1;
                }
            }
            granted
        };
        for pending in granted {
            self.spawn(pending);
        }
    }

    fn spawn(self: &Rc<Self>, pending: Pending) {
        let Pending { id, scope, job, .. } = pending;
        debug!(target: TARGET, task = id, "Granted locks");

        let held = scope.clone();
        let runner = Rc::clone(self);
        let future = async move {
            job(Rc::clone(&runner.context)).await;
            runner.finish(id, &scope);
            runner.consume_pending();
        };
        self.running.set(self.running.get() + 1);
        if let Err(e) = self.spawner.spawn_local(future) {
            warn!(target: TARGET, task = id, error = %e, "Could not spawn task");
            self.finish(id, &held);
        }
    }

    fn finish(&self, id: TaskId, scope: &[String]) {
        self.context.locks().borrow_mut().release_lock(id, scope);
        self.running.set(self.running.get().saturating_sub(1));
        trace!(target: TARGET, task = id, "Released locks");
    }

    /// Stops accepting tasks and cancels the queued ones. Running tasks
    /// finish normally.
    pub fn close(&self) {
        self.closed.set(true);
        let cancelled: Vec<Pending> = self.queue.borrow_mut().drain(..).collect();
        let mut locks = self.context.locks().borrow_mut();
        for pending in &cancelled {
            locks.release_lock(pending.id, &pending.scope);
        }
        debug!(target: TARGET, cancelled = cancelled.len(), "Runner closed");
    }
}

/// Takes the locks `pending` needs, all or nothing.
fn acquire(locks: &mut LockManager, pending: &Pending) -> bool {
    let (reserve, lock) = match pending.tx_type {
        TransactionType::ReadOnly => (LockType::ReservedReadOnly, LockType::Shared),
        TransactionType::ReadWrite => (LockType::ReservedReadWrite, LockType::Exclusive),
    };
    if !locks.request_lock(pending.id, &pending.scope, reserve) {
        trace!(target: TARGET, task = pending.id, ?reserve, "Reservation refused");
        return false;
    }
    if locks.request_lock(pending.id, &pending.scope, lock) {
        trace!(target: TARGET, task = pending.id, ?lock, "Lock granted");
        return true;
    }
    // A read reservation would keep a reserved writer from escalating.
    if pending.tx_type == TransactionType::ReadOnly {
        locks.release_lock(pending.id, &pending.scope);
    }
    trace!(target: TARGET, task = pending.id, ?lock, "Lock refused");
    false
}

/// Resolves to the result of a scheduled task.
///
/// Dropping the handle does not cancel the task.
pub struct TaskHandle<T> {
    id: TaskId,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut PollContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let id = this.id;
        this.receiver
            .poll_unpin(cx)
            .map(|result| result.unwrap_or(Err(DatabaseError::Cancelled { task: id })))
    }
}
