//! The implicit per-table row-id index.

use crate::btree::BTreeIndex;
use crate::comparator::KeyComparator;
use crate::key::Key;
use crate::key_range::IndexRange;
use crate::stats::IndexStats;
use crate::traits::{Index, IndexError};
use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::{RowId, Value};

/// Maps row ids to themselves so every table can be scanned in id order.
///
/// `cost` always reports the full table size: the planner treats this index
/// as the worst case and only picks it when nothing else applies.
#[derive(Debug)]
pub struct RowIdIndex {
    tree: BTreeIndex,
}

impl RowIdIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            tree: BTreeIndex::new(name, true, KeyComparator::asc()),
        }
    }

    /// The key a row id is stored under.
    pub fn key(row_id: RowId) -> Key {
        Key::Single(Value::Int64(row_id as i64))
    }
}

impl Index for RowIdIndex {
    fn name(&self) -> &str {
        self.tree.name()
    }

    fn add(&mut self, key: Key, row_id: RowId) -> Result<(), IndexError> {
        self.tree.add(key, row_id)
    }

    fn set(&mut self, key: Key, row_id: RowId) {
        self.tree.set(key, row_id)
    }

    fn remove(&mut self, key: &Key, row_id: Option<RowId>) {
        self.tree.remove(key, row_id)
    }

    fn get(&self, key: &Key) -> Vec<RowId> {
        self.tree.get(key)
    }

    fn get_range(
        &self,
        ranges: &[IndexRange],
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId> {
        self.tree.get_range(ranges, reverse, limit, skip)
    }

    fn cost(&self, _range: Option<&IndexRange>) -> usize {
        self.tree.stats().total_rows()
    }

    fn min(&self) -> Option<(Key, Vec<RowId>)> {
        self.tree.min()
    }

    fn max(&self) -> Option<(Key, Vec<RowId>)> {
        self.tree.max()
    }

    fn contains_key(&self, key: &Key) -> bool {
        self.tree.contains_key(key)
    }

    fn clear(&mut self) {
        self.tree.clear()
    }

    fn stats(&self) -> &IndexStats {
        self.tree.stats()
    }

    fn is_unique(&self) -> bool {
        true
    }

    fn comparator(&self) -> &KeyComparator {
        self.tree.comparator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_range::KeyRange;
    use alloc::vec;

    #[test]
    fn test_cost_is_always_table_size() {
        let mut idx = RowIdIndex::new("t.#");
        for id in 1..=10 {
            idx.add(RowIdIndex::key(id), id).unwrap();
        }
        let only = IndexRange::Single(KeyRange::only(Value::Int64(3)));
        assert_eq!(idx.cost(Some(&only)), 10);
        assert_eq!(idx.get_range(&[only], false, None, 0), vec![3]);
        assert!(idx.add(RowIdIndex::key(3), 3).is_err());
        assert_eq!(idx.name(), "t.#");
    }
}
