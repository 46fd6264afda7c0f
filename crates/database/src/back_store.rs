//! Backing store abstraction.
//!
//! The engine keeps every row in memory. A back store receives the diffs of
//! committed transactions for durable storage and can report changes made
//! by other connections through `notify`.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use trellis_core::schema::Schema;
use trellis_storage::TableDiff;

use crate::error::{DatabaseError, Result};
use crate::task::TransactionType;

/// Callback receiving diffs committed outside this connection.
pub type ChangeHandler = Rc<dyn Fn(&[TableDiff])>;

/// Durable storage behind a database connection.
pub trait BackStore {
    /// Prepares the store for `schema`. Called once by `Database::connect`.
    fn init<'a>(&'a self, schema: &'a Schema) -> LocalBoxFuture<'a, Result<()>>;

    /// Starts a physical transaction carrying the diffs of one task.
    fn create_tx(&self, tx_type: TransactionType, diffs: Vec<TableDiff>) -> Box<dyn Tx>;

    /// Registers the handler for external changes, replacing any earlier one.
    fn subscribe(&self, handler: ChangeHandler);

    fn unsubscribe(&self);

    /// Reports diffs committed elsewhere to the subscribed handler.
    fn notify(&self, diffs: &[TableDiff]);
}

/// One physical transaction.
pub trait Tx {
    fn commit(self: Box<Self>) -> LocalBoxFuture<'static, Result<()>>;

    fn abort(self: Box<Self>);
}

#[derive(Default)]
struct MemoryState {
    committed: Vec<TableDiff>,
    handler: Option<ChangeHandler>,
    fail_next_commit: bool,
}

/// A back store that keeps committed diffs in memory.
///
/// Useful for tests and for databases that need no persistence.
#[derive(Clone, Default)]
pub struct MemoryBackStore {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryBackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs of every committed read-write transaction, oldest first.
    pub fn committed(&self) -> Vec<TableDiff> {
        self.state.borrow().committed.clone()
    }

    /// Makes the next commit fail, as a lost write would.
    pub fn fail_next_commit(&self) {
        self.state.borrow_mut().fail_next_commit = true;
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().handler.is_some()
    }
}

impl BackStore for MemoryBackStore {
    fn init<'a>(&'a self, _schema: &'a Schema) -> LocalBoxFuture<'a, Result<()>> {
        future::ready(Ok(())).boxed_local()
    }

    fn create_tx(&self, tx_type: TransactionType, diffs: Vec<TableDiff>) -> Box<dyn Tx> {
        Box::new(MemoryTx {
            state: Rc::clone(&self.state),
            tx_type,
            diffs,
        })
    }

    fn subscribe(&self, handler: ChangeHandler) {
        self.state.borrow_mut().handler = Some(handler);
    }

    fn unsubscribe(&self) {
        self.state.borrow_mut().handler = None;
    }

    fn notify(&self, diffs: &[TableDiff]) {
        let handler = self.state.borrow().handler.clone();
        if let Some(handler) = handler {
            handler(diffs);
        }
    }
}

struct MemoryTx {
    state: Rc<RefCell<MemoryState>>,
    tx_type: TransactionType,
    diffs: Vec<TableDiff>,
}

impl Tx for MemoryTx {
    fn commit(self: Box<Self>) -> LocalBoxFuture<'static, Result<()>> {
        let MemoryTx {
            state,
            tx_type,
            diffs,
        } = *self;
        async move {
            let mut state = state.borrow_mut();
            if state.fail_next_commit {
                state.fail_next_commit = false;
                return Err(DatabaseError::BackStore(String::from("commit rejected")));
            }
            if tx_type == TransactionType::ReadWrite {
                state.committed.extend(diffs);
            }
            Ok(())
        }
        .boxed_local()
    }

    fn abort(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;

    #[test]
    fn test_commit_records_diffs() {
        let store = MemoryBackStore::new();
        let tx = store.create_tx(TransactionType::ReadWrite, vec![TableDiff::new("t")]);
        block_on(tx.commit()).unwrap();
        assert_eq!(store.committed().len(), 1);

        let tx = store.create_tx(TransactionType::ReadOnly, vec![TableDiff::new("t")]);
        block_on(tx.commit()).unwrap();
        assert_eq!(store.committed().len(), 1);
    }

    #[test]
    fn test_failed_commit() {
        let store = MemoryBackStore::new();
        store.fail_next_commit();
        let tx = store.create_tx(TransactionType::ReadWrite, vec![TableDiff::new("t")]);
        assert!(matches!(block_on(tx.commit()), Err(DatabaseError::BackStore(_))));
        assert!(store.committed().is_empty());
    }

    #[test]
    fn test_notify_reaches_subscriber() {
        let store = MemoryBackStore::new();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        store.subscribe(Rc::new(move |diffs: &[TableDiff]| counter.set(counter.get() + diffs.len())));
        store.notify(&[TableDiff::new("a"), TableDiff::new("b")]);
        assert_eq!(seen.get(), 2);

        store.unsubscribe();
        store.notify(&[TableDiff::new("a")]);
        assert_eq!(seen.get(), 2);
    }
}
