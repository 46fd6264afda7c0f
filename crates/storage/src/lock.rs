//! Table-scoped lock manager.
//!
//! Read-only tasks first reserve a table for reading and then take a shared
//! lock. Read-write tasks reserve the table for writing and then escalate to
//! an exclusive lock, which is granted only once every reader has left. A
//! pending write reservation keeps new readers out, so writers are not starved.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

/// Identifier of the task holding or requesting a lock.
pub type TaskId = u64;

/// Lock kinds, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockType {
    /// Announces an upcoming read. Granted unless a write is reserved.
    ReservedReadOnly,
    /// Announces an upcoming write. At most one holder per table.
    ReservedReadWrite,
    /// Read access. Requires this task's read-only reservation.
    Shared,
    /// Write access. Requires this task's read-write reservation and no readers.
    Exclusive,
}

#[derive(Clone, Debug, Default)]
struct LockEntry {
    exclusive: Option<TaskId>,
    reserved_read_write: Option<TaskId>,
    reserved_read_only: BTreeSet<TaskId>,
    shared: BTreeSet<TaskId>,
}

impl LockEntry {
    fn can_acquire(&self, task: TaskId, lock_type: LockType) -> bool {
        match lock_type {
            LockType::Exclusive => {
                self.shared.is_empty()
                    && self.reserved_read_only.is_empty()
                    && self.exclusive.is_none()
                    && self.reserved_read_write == Some(task)
            }
            LockType::Shared => {
                self.exclusive.is_none()
                    && self.reserved_read_write.is_none()
                    && self.reserved_read_only.contains(&task)
            }
            LockType::ReservedReadOnly => self.reserved_read_write.is_none(),
            LockType::ReservedReadWrite => {
                self.reserved_read_write.is_none() || self.reserved_read_write == Some(task)
            }
        }
    }

    fn grant(&mut self, task: TaskId, lock_type: LockType) {
        match lock_type {
            LockType::Exclusive => {
                self.exclusive = Some(task);
                self.reserved_read_write = None;
            }
            LockType::Shared => {
                self.shared.insert(task);
                self.reserved_read_only.remove(&task);
            }
            LockType::ReservedReadOnly => {
                self.reserved_read_only.insert(task);
            }
            LockType::ReservedReadWrite => {
                self.reserved_read_write = Some(task);
            }
        }
    }

    fn release(&mut self, task: TaskId) {
        if self.exclusive == Some(task) {
            self.exclusive = None;
        }
        if self.reserved_read_write == Some(task) {
            self.reserved_read_write = None;
        }
        self.reserved_read_only.remove(&task);
        self.shared.remove(&task);
    }

    fn is_free(&self) -> bool {
        self.exclusive.is_none()
            && self.reserved_read_write.is_none()
            && self.reserved_read_only.is_empty()
            && self.shared.is_empty()
    }

    fn holds(&self, task: TaskId, lock_type: LockType) -> bool {
        match lock_type {
            LockType::Exclusive => self.exclusive == Some(task),
            LockType::Shared => self.shared.contains(&task),
            LockType::ReservedReadOnly => self.reserved_read_only.contains(&task),
            LockType::ReservedReadWrite => self.reserved_read_write == Some(task),
        }
    }
}

/// The lock table: one entry per table name.
#[derive(Debug, Default)]
pub struct LockManager {
    entries: BTreeMap<String, LockEntry>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `lock_type` on every table of `scope`, or on none of them.
    ///
    /// Returns whether the lock was granted.
    pub fn request_lock<S: AsRef<str>>(
        &mut self,
        task: TaskId,
        scope: &[S],
        lock_type: LockType,
    ) -> bool {
        let grantable = scope.iter().all(|table| {
            self.entries
                .get(table.as_ref())
                .map_or(true, |e| e.can_acquire(task, lock_type))
        });
        if !grantable {
            return false;
        }
        for table in scope {
            self.entries
                .entry(String::from(table.as_ref()))
                .or_default()
                .grant(task, lock_type);
        }
        true
    }

    /// Drops every lock `task` holds on `scope`.
    pub fn release_lock<S: AsRef<str>>(&mut self, task: TaskId, scope: &[S]) {
        for table in scope {
            let table = table.as_ref();
            let free = match self.entries.get_mut(table) {
                Some(entry) => {
                    entry.release(task);
                    entry.is_free()
                }
                None => false,
            };
            if free {
                self.entries.remove(table);
            }
        }
    }

    /// Drops pending write reservations on `scope`, whoever holds them.
    ///
    /// A task losing its reservation on one table of `scope` loses it on
    /// every table, so no partial reservation is left behind.
    pub fn clear_reserved_locks<S: AsRef<str>>(&mut self, scope: &[S]) {
        let holders: BTreeSet<TaskId> = scope
            .iter()
            .filter_map(|table| self.entries.get(table.as_ref()))
            .filter_map(|entry| entry.reserved_read_write)
            .collect();
        for entry in self.entries.values_mut() {
            if entry.reserved_read_write.map_or(false, |task| holders.contains(&task)) {
                entry.reserved_read_write = None;
            }
        }
        self.entries.retain(|_, e| !e.is_free());
    }

    /// Returns whether `task` holds `lock_type` on `table`.
    pub fn holds(&self, task: TaskId, table: &str, lock_type: LockType) -> bool {
        self.entries
            .get(table)
            .map_or(false, |e| e.holds(task, lock_type))
    }

    /// Tables on which any lock or reservation is outstanding.
    pub fn locked_tables(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: &[&str] = &["t"];

    fn read(lm: &mut LockManager, task: TaskId, scope: &[&str]) -> bool {
        lm.request_lock(task, scope, LockType::ReservedReadOnly)
            && lm.request_lock(task, scope, LockType::Shared)
    }

    fn write(lm: &mut LockManager, task: TaskId, scope: &[&str]) -> bool {
        lm.request_lock(task, scope, LockType::ReservedReadWrite)
            && lm.request_lock(task, scope, LockType::Exclusive)
    }

    #[test]
    fn test_shared_locks_coexist() {
        let mut lm = LockManager::new();
        assert!(read(&mut lm, 1, T));
        assert!(read(&mut lm, 2, T));
        assert!(lm.holds(1, "t", LockType::Shared));
        assert!(lm.holds(2, "t", LockType::Shared));
        assert!(!lm.holds(1, "t", LockType::ReservedReadOnly));
    }

    #[test]
    fn test_shared_requires_reservation() {
        let mut lm = LockManager::new();
        assert!(!lm.request_lock(1, T, LockType::Shared));
    }

    #[test]
    fn test_exclusive_requires_own_reservation() {
        let mut lm = LockManager::new();
        assert!(!lm.request_lock(1, T, LockType::Exclusive));
        assert!(lm.request_lock(2, T, LockType::ReservedReadWrite));
        assert!(!lm.request_lock(1, T, LockType::Exclusive));
        assert!(lm.request_lock(2, T, LockType::Exclusive));
        assert!(!lm.holds(2, "t", LockType::ReservedReadWrite));
    }

    #[test]
    fn test_writers_exclude_each_other() {
        let mut lm = LockManager::new();
        assert!(write(&mut lm, 1, T));
        assert!(!write(&mut lm, 2, T));
        lm.release_lock(1, T);
        assert!(write(&mut lm, 2, T));
    }

    #[test]
    fn test_exclusive_blocks_readers() {
        let mut lm = LockManager::new();
        assert!(write(&mut lm, 1, T));
        // The reservation itself is granted, the shared lock is not.
        assert!(!read(&mut lm, 2, T));
        lm.release_lock(1, T);
        assert!(lm.request_lock(2, T, LockType::Shared));
    }

    #[test]
    fn test_reserved_writer_waits_for_readers() {
        let mut lm = LockManager::new();
        assert!(read(&mut lm, 1, T));
        assert!(!write(&mut lm, 2, T));
        assert!(lm.holds(2, "t", LockType::ReservedReadWrite));

        // New readers cannot even reserve while a write is pending.
        assert!(!lm.request_lock(3, T, LockType::ReservedReadOnly));

        lm.release_lock(1, T);
        assert!(lm.request_lock(2, T, LockType::Exclusive));
    }

    #[test]
    fn test_request_is_all_or_nothing() {
        let mut lm = LockManager::new();
        assert!(lm.request_lock(1, &["b"], LockType::ReservedReadWrite));
        assert!(!lm.request_lock(2, &["a", "b"], LockType::ReservedReadWrite));
        assert!(!lm.holds(2, "a", LockType::ReservedReadWrite));
        assert!(write(&mut lm, 3, &["a"]));
    }

    #[test]
    fn test_disjoint_scopes_do_not_conflict() {
        let mut lm = LockManager::new();
        assert!(write(&mut lm, 1, &["a"]));
        assert!(write(&mut lm, 2, &["b"]));
        assert!(read(&mut lm, 3, &["c"]));
    }

    #[test]
    fn test_clear_reserved_locks() {
        let mut lm = LockManager::new();
        assert!(read(&mut lm, 1, T));
        assert!(!write(&mut lm, 2, T));
        assert!(!lm.request_lock(3, T, LockType::ReservedReadOnly));

        lm.clear_reserved_locks(T);
        assert!(!lm.holds(2, "t", LockType::ReservedReadWrite));
        assert!(read(&mut lm, 3, T));
    }

    #[test]
    fn test_clear_reserved_locks_spans_holder_scope() {
        let mut lm = LockManager::new();
        assert!(read(&mut lm, 1, &["a"]));
        assert!(!write(&mut lm, 2, &["a", "b"]));
        assert!(lm.holds(2, "b", LockType::ReservedReadWrite));

        lm.clear_reserved_locks(&["a"]);
        assert!(!lm.holds(2, "a", LockType::ReservedReadWrite));
        assert!(!lm.holds(2, "b", LockType::ReservedReadWrite));
        assert!(write(&mut lm, 3, &["b"]));
    }

    #[test]
    fn test_release_frees_entries() {
        let mut lm = LockManager::new();
        assert!(read(&mut lm, 1, &["a", "b"]));
        assert_eq!(lm.locked_tables(), alloc::vec!["a", "b"]);
        lm.release_lock(1, &["a", "b"]);
        assert!(lm.locked_tables().is_empty());
    }
}
