//! B+Tree node definitions.

use crate::comparator::KeyComparator;
use crate::key::Key;
use alloc::vec::Vec;
use core::cmp::Ordering;
use trellis_core::RowId;

/// Node identifier in the B+Tree arena.
pub type NodeId = usize;

/// A node in the B+Tree.
#[derive(Clone, Debug)]
pub struct Node {
    pub keys: Vec<Key>,
    /// Leaf nodes only: row ids per key.
    pub values: Vec<Vec<RowId>>,
    /// Internal nodes only: child node ids, one more than `keys`.
    pub children: Vec<NodeId>,
    pub next: Option<NodeId>,
    pub prev: Option<NodeId>,
    pub is_leaf: bool,
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn new_leaf() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            next: None,
            prev: None,
            is_leaf: true,
            parent: None,
        }
    }

    pub fn new_internal() -> Self {
        Self {
            is_leaf: false,
            ..Self::new_leaf()
        }
    }

    #[inline]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Position of the first key not less than `key`.
    pub fn find_key_position(&self, key: &Key, cmp: &KeyComparator) -> usize {
        self.keys.partition_point(|k| cmp.is_less(k, key))
    }

    /// Exact position of `key`, if present.
    pub fn find_key(&self, key: &Key, cmp: &KeyComparator) -> Option<usize> {
        let pos = self.find_key_position(key, cmp);
        (pos < self.keys.len() && cmp.compare(&self.keys[pos], key) == Ordering::Equal)
            .then_some(pos)
    }

    /// Inserts a row id at `pos` of a leaf, appending to an existing key.
    /// Returns false if the row id was already stored under the key.
    pub fn insert_at(&mut self, pos: usize, key: Key, value: RowId, cmp: &KeyComparator) -> bool {
        debug_assert!(self.is_leaf);
        if pos < self.keys.len() && cmp.compare(&self.keys[pos], &key) == Ordering::Equal {
            if self.values[pos].contains(&value) {
                return false;
            }
            self.values[pos].push(value);
        } else {
            self.keys.insert(pos, key);
            self.values.insert(pos, alloc::vec![value]);
        }
        true
    }

    /// Removes `value` (or every value) at `pos` of a leaf; drops the key
    /// once it has no values left. Returns the number of row ids removed.
    pub fn remove_at(&mut self, pos: usize, value: Option<RowId>) -> usize {
        debug_assert!(self.is_leaf);
        match value {
            Some(v) => {
                let values = &mut self.values[pos];
                let before = values.len();
                values.retain(|&x| x != v);
                let removed = before - values.len();
                if values.is_empty() {
                    self.keys.remove(pos);
                    self.values.remove(pos);
                }
                removed
            }
            None => {
                self.keys.remove(pos);
                self.values.remove(pos).len()
            }
        }
    }
}
