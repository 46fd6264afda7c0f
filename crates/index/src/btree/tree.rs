//! B+Tree implementation.

use super::node::{Node, NodeId};
use crate::comparator::KeyComparator;
use crate::key::Key;
use crate::key_range::IndexRange;
use crate::stats::IndexStats;
use crate::traits::{Index, IndexError};
use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::schema::Order;
use trellis_core::RowId;

/// Default order (branching factor) for the B+Tree.
pub const DEFAULT_ORDER: usize = 64;

/// Smaller orders break the borrow/merge arithmetic.
const MIN_ORDER: usize = 4;

/// A B+Tree index, unique or multi-entry.
#[derive(Debug)]
pub struct BTreeIndex {
    name: String,
    arena: Vec<Node>,
    root: NodeId,
    /// Maximum number of keys per node.
    order: usize,
    unique: bool,
    comparator: KeyComparator,
    stats: IndexStats,
}

impl BTreeIndex {
    /// Creates an index with the default order.
    pub fn new(name: impl Into<String>, unique: bool, comparator: KeyComparator) -> Self {
        Self::with_order(name, unique, comparator, DEFAULT_ORDER)
    }

    /// Creates an index holding at most `order` keys per node.
    pub fn with_order(
        name: impl Into<String>,
        unique: bool,
        comparator: KeyComparator,
        order: usize,
    ) -> Self {
        Self {
            name: name.into(),
            arena: alloc::vec![Node::new_leaf()],
            root: 0,
            order: order.max(MIN_ORDER),
            unique,
            comparator,
            stats: IndexStats::new(),
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    fn min_keys(&self) -> usize {
        (self.order - 1) / 2
    }

    fn alloc_node(&mut self, node: Node) -> NodeId {
        self.arena.push(node);
        self.arena.len() - 1
    }

    /// Finds the leaf that holds (or would hold) `key`.
    fn find_leaf(&self, key: &Key) -> NodeId {
        let mut current = self.root;
        loop {
            let node = &self.arena[current];
            if node.is_leaf {
                return current;
            }
            let pos = node
                .keys
                .partition_point(|k| !self.comparator.is_less(key, k));
            current = node.children[pos];
        }
    }

    fn insert(&mut self, key: Key, value: RowId) -> Result<(), IndexError> {
        let leaf_id = self.find_leaf(&key);
        let pos = self.arena[leaf_id].find_key_position(&key, &self.comparator);
        if self.unique && self.arena[leaf_id].find_key(&key, &self.comparator).is_some() {
            return Err(IndexError::DuplicateKey(key));
        }

        if self.arena[leaf_id].insert_at(pos, key.clone(), value, &self.comparator) {
            self.stats.add(&key, 1);
        }
        if self.arena[leaf_id].key_count() >= self.order {
            self.split_leaf(leaf_id);
        }
        Ok(())
    }

    fn split_leaf(&mut self, leaf_id: NodeId) {
        let mid = self.arena[leaf_id].key_count() / 2;

        let mut new_leaf = Node::new_leaf();
        new_leaf.keys = self.arena[leaf_id].keys.split_off(mid);
        new_leaf.values = self.arena[leaf_id].values.split_off(mid);
        new_leaf.next = self.arena[leaf_id].next;
        new_leaf.prev = Some(leaf_id);
        new_leaf.parent = self.arena[leaf_id].parent;
        let promote_key = new_leaf.keys[0].clone();
        let new_leaf_id = self.alloc_node(new_leaf);

        if let Some(next_id) = self.arena[leaf_id].next {
            self.arena[next_id].prev = Some(new_leaf_id);
        }
        self.arena[leaf_id].next = Some(new_leaf_id);

        self.insert_into_parent(leaf_id, promote_key, new_leaf_id);
    }

    fn insert_into_parent(&mut self, left_id: NodeId, key: Key, right_id: NodeId) {
        match self.arena[left_id].parent {
            None => {
                let mut new_root = Node::new_internal();
                new_root.children.push(left_id);
                new_root.children.push(right_id);
                new_root.keys.push(key);
                let new_root_id = self.alloc_node(new_root);
                self.arena[left_id].parent = Some(new_root_id);
                self.arena[right_id].parent = Some(new_root_id);
                self.root = new_root_id;
            }
            Some(parent_id) => {
                let parent = &self.arena[parent_id];
                let pos = parent
                    .children
                    .iter()
                    .position(|&c| c == left_id)
                    .unwrap_or_else(|| {
                        parent
                            .keys
                            .partition_point(|k| !self.comparator.is_less(&key, k))
                    });
                self.arena[parent_id].keys.insert(pos, key);
                self.arena[parent_id].children.insert(pos + 1, right_id);
                self.arena[right_id].parent = Some(parent_id);

                if self.arena[parent_id].key_count() >= self.order {
                    self.split_internal(parent_id);
                }
            }
        }
    }

    fn split_internal(&mut self, node_id: NodeId) {
        let mid = self.arena[node_id].key_count() / 2;
        let promote_key = self.arena[node_id].keys[mid].clone();

        let mut new_node = Node::new_internal();
        new_node.keys = self.arena[node_id].keys.split_off(mid + 1);
        new_node.children = self.arena[node_id].children.split_off(mid + 1);
        new_node.parent = self.arena[node_id].parent;
        // drop the promoted key from the left half
        self.arena[node_id].keys.pop();

        let moved = new_node.children.clone();
        let new_node_id = self.alloc_node(new_node);
        for child_id in moved {
            self.arena[child_id].parent = Some(new_node_id);
        }

        self.insert_into_parent(node_id, promote_key, new_node_id);
    }

    /// Removes `value` (or all values) under `key`. Returns the count removed.
    fn delete(&mut self, key: &Key, value: Option<RowId>) -> usize {
        let leaf_id = self.find_leaf(key);
        let Some(pos) = self.arena[leaf_id].find_key(key, &self.comparator) else {
            return 0;
        };
        let removed = self.arena[leaf_id].remove_at(pos, value);
        self.stats.remove(removed);
        if leaf_id != self.root {
            self.handle_underflow(leaf_id);
        }
        removed
    }

    fn handle_underflow(&mut self, node_id: NodeId) {
        let Some(parent_id) = self.arena[node_id].parent else {
            return;
        };
        let min_keys = self.min_keys();
        if self.arena[node_id].key_count() >= min_keys {
            return;
        }
        let Some(pos) = self.arena[parent_id]
            .children
            .iter()
            .position(|&c| c == node_id)
        else {
            return;
        };
        let sibling_count = self.arena[parent_id].children.len();

        if pos > 0 {
            let left_id = self.arena[parent_id].children[pos - 1];
            if self.arena[left_id].key_count() > min_keys {
                self.borrow_from_left(node_id, left_id, parent_id, pos);
                return;
            }
        }
        if pos + 1 < sibling_count {
            let right_id = self.arena[parent_id].children[pos + 1];
            if self.arena[right_id].key_count() > min_keys {
                self.borrow_from_right(node_id, right_id, parent_id, pos);
                return;
            }
        }

        if pos > 0 {
            let left_id = self.arena[parent_id].children[pos - 1];
            self.merge_nodes(left_id, node_id, parent_id, pos - 1);
        } else if pos + 1 < sibling_count {
            let right_id = self.arena[parent_id].children[pos + 1];
            self.merge_nodes(node_id, right_id, parent_id, pos);
        }
    }

    fn borrow_from_left(&mut self, node_id: NodeId, left_id: NodeId, parent_id: NodeId, pos: usize) {
        if self.arena[node_id].is_leaf {
            let (Some(key), Some(values)) = (
                self.arena[left_id].keys.pop(),
                self.arena[left_id].values.pop(),
            ) else {
                return;
            };
            self.arena[parent_id].keys[pos - 1] = key.clone();
            self.arena[node_id].keys.insert(0, key);
            self.arena[node_id].values.insert(0, values);
        } else {
            let (Some(left_key), Some(left_child)) = (
                self.arena[left_id].keys.pop(),
                self.arena[left_id].children.pop(),
            ) else {
                return;
            };
            let parent_key = core::mem::replace(&mut self.arena[parent_id].keys[pos - 1], left_key);
            self.arena[node_id].keys.insert(0, parent_key);
            self.arena[node_id].children.insert(0, left_child);
            self.arena[left_child].parent = Some(node_id);
        }
    }

    fn borrow_from_right(&mut self, node_id: NodeId, right_id: NodeId, parent_id: NodeId, pos: usize) {
        if self.arena[node_id].is_leaf {
            let key = self.arena[right_id].keys.remove(0);
            let values = self.arena[right_id].values.remove(0);
            self.arena[node_id].keys.push(key);
            self.arena[node_id].values.push(values);
            self.arena[parent_id].keys[pos] = self.arena[right_id].keys[0].clone();
        } else {
            let right_key = self.arena[right_id].keys.remove(0);
            let right_child = self.arena[right_id].children.remove(0);
            let parent_key = core::mem::replace(&mut self.arena[parent_id].keys[pos], right_key);
            self.arena[node_id].keys.push(parent_key);
            self.arena[node_id].children.push(right_child);
            self.arena[right_child].parent = Some(node_id);
        }
    }

    /// Folds `right_id` into `left_id`; `pos` is the separator between them.
    fn merge_nodes(&mut self, left_id: NodeId, right_id: NodeId, parent_id: NodeId, pos: usize) {
        let right_keys = core::mem::take(&mut self.arena[right_id].keys);
        if self.arena[left_id].is_leaf {
            let right_values = core::mem::take(&mut self.arena[right_id].values);
            self.arena[left_id].keys.extend(right_keys);
            self.arena[left_id].values.extend(right_values);

            let next = self.arena[right_id].next;
            self.arena[left_id].next = next;
            if let Some(next_id) = next {
                self.arena[next_id].prev = Some(left_id);
            }
        } else {
            let separator = self.arena[parent_id].keys[pos].clone();
            let right_children = core::mem::take(&mut self.arena[right_id].children);
            for &child_id in &right_children {
                self.arena[child_id].parent = Some(left_id);
            }
            self.arena[left_id].keys.push(separator);
            self.arena[left_id].keys.extend(right_keys);
            self.arena[left_id].children.extend(right_children);
        }

        self.arena[parent_id].keys.remove(pos);
        self.arena[parent_id].children.remove(pos + 1);

        if parent_id == self.root {
            if self.arena[parent_id].keys.is_empty() {
                self.root = left_id;
                self.arena[left_id].parent = None;
            }
        } else {
            self.handle_underflow(parent_id);
        }
    }

    fn leftmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        while !self.arena[current].is_leaf {
            current = self.arena[current].children[0];
        }
        current
    }

    fn rightmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        while !self.arena[current].is_leaf {
            let children = &self.arena[current].children;
            current = children[children.len() - 1];
        }
        current
    }

    /// Leaf and position of the first key that is not before `range`.
    fn seek_first(&self, range: Option<&IndexRange>) -> (NodeId, usize) {
        let mut current = self.root;
        loop {
            let node = &self.arena[current];
            let pos = match range {
                None => 0,
                Some(r) => node
                    .keys
                    .partition_point(|k| self.comparator.before_range(k, r)),
            };
            if node.is_leaf {
                return (current, pos);
            }
            current = node.children[pos];
        }
    }

    /// Leaf and end position (exclusive) of the last key not past `range`.
    fn seek_last(&self, range: Option<&IndexRange>) -> (NodeId, usize) {
        let mut current = self.root;
        loop {
            let node = &self.arena[current];
            let pos = match range {
                None => node.keys.len(),
                Some(r) => node
                    .keys
                    .partition_point(|k| !self.comparator.past_range(k, r)),
            };
            if node.is_leaf {
                return (current, pos);
            }
            current = node.children[pos];
        }
    }

    /// Visits the row id lists of every key in `range` in tree order.
    /// Returns false if `visit` asked to stop.
    fn scan_forward(
        &self,
        range: Option<&IndexRange>,
        visit: &mut dyn FnMut(&[RowId]) -> bool,
    ) -> bool {
        let (mut node_id, mut pos) = self.seek_first(range);
        loop {
            let node = &self.arena[node_id];
            if pos >= node.key_count() {
                match node.next {
                    Some(next) => {
                        node_id = next;
                        pos = 0;
                        continue;
                    }
                    None => return true,
                }
            }
            let key = &node.keys[pos];
            pos += 1;
            if let Some(r) = range {
                if self.comparator.past_range(key, r) {
                    return true;
                }
                if !self.comparator.is_in_range(key, r) {
                    continue;
                }
            }
            if !visit(&node.values[pos - 1]) {
                return false;
            }
        }
    }

    fn scan_backward(
        &self,
        range: Option<&IndexRange>,
        visit: &mut dyn FnMut(&[RowId]) -> bool,
    ) -> bool {
        let (mut node_id, mut end) = self.seek_last(range);
        loop {
            let node = &self.arena[node_id];
            if end == 0 {
                match node.prev {
                    Some(prev) => {
                        node_id = prev;
                        end = self.arena[prev].key_count();
                        continue;
                    }
                    None => return true,
                }
            }
            end -= 1;
            let key = &node.keys[end];
            if let Some(r) = range {
                if self.comparator.before_range(key, r) {
                    return true;
                }
                if !self.comparator.is_in_range(key, r) {
                    continue;
                }
            }
            let ids: Vec<RowId> = node.values[end].iter().rev().copied().collect();
            if !visit(&ids) {
                return false;
            }
        }
    }

    fn first_entry(&self) -> Option<(Key, Vec<RowId>)> {
        let leaf = &self.arena[self.leftmost_leaf()];
        Some((leaf.keys.first()?.clone(), leaf.values[0].clone()))
    }

    fn last_entry(&self) -> Option<(Key, Vec<RowId>)> {
        let leaf = &self.arena[self.rightmost_leaf()];
        let last = leaf.key_count().checked_sub(1)?;
        Some((leaf.keys[last].clone(), leaf.values[last].clone()))
    }

    fn leading_order(&self) -> Order {
        self.comparator.orders().first().copied().unwrap_or_default()
    }
}

impl Index for BTreeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self, key: Key, row_id: RowId) -> Result<(), IndexError> {
        self.insert(key, row_id)
    }

    fn set(&mut self, key: Key, row_id: RowId) {
        self.delete(&key, None);
        // the key is gone, so a unique insert cannot collide
        let _ = self.insert(key, row_id);
    }

    fn remove(&mut self, key: &Key, row_id: Option<RowId>) {
        self.delete(key, row_id);
    }

    fn get(&self, key: &Key) -> Vec<RowId> {
        let leaf = &self.arena[self.find_leaf(key)];
        leaf.find_key(key, &self.comparator)
            .map(|pos| leaf.values[pos].clone())
            .unwrap_or_default()
    }

    fn get_range(
        &self,
        ranges: &[IndexRange],
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId> {
        let mut out = Vec::new();
        let mut skipped = 0;
        let mut visit = |ids: &[RowId]| -> bool {
            for &id in ids {
                if skipped < skip {
                    skipped += 1;
                    continue;
                }
                if limit.is_some_and(|l| out.len() >= l) {
                    return false;
                }
                out.push(id);
            }
            limit.map_or(true, |l| out.len() < l)
        };

        if ranges.is_empty() {
            if reverse {
                self.scan_backward(None, &mut visit);
            } else {
                self.scan_forward(None, &mut visit);
            }
        } else {
            let mut sorted = ranges.to_vec();
            self.comparator.sort_ranges(&mut sorted);
            if reverse {
                for range in sorted.iter().rev() {
                    if !self.scan_backward(Some(range), &mut visit) {
                        break;
                    }
                }
            } else {
                for range in &sorted {
                    if !self.scan_forward(Some(range), &mut visit) {
                        break;
                    }
                }
            }
        }
        out
    }

    fn cost(&self, range: Option<&IndexRange>) -> usize {
        match range {
            None => self.stats.total_rows(),
            Some(r) if r.is_all() => self.stats.total_rows(),
            Some(r) => {
                let mut count = 0;
                self.scan_forward(Some(r), &mut |ids: &[RowId]| {
                    count += ids.len();
                    true
                });
                count
            }
        }
    }

    fn min(&self) -> Option<(Key, Vec<RowId>)> {
        match self.leading_order() {
            Order::Asc => self.first_entry(),
            Order::Desc => self.last_entry(),
        }
    }

    fn max(&self) -> Option<(Key, Vec<RowId>)> {
        match self.leading_order() {
            Order::Asc => self.last_entry(),
            Order::Desc => self.first_entry(),
        }
    }

    fn contains_key(&self, key: &Key) -> bool {
        let leaf = &self.arena[self.find_leaf(key)];
        leaf.find_key(key, &self.comparator).is_some()
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.arena.push(Node::new_leaf());
        self.root = 0;
        self.stats.clear();
    }

    fn stats(&self) -> &IndexStats {
        &self.stats
    }

    fn is_unique(&self) -> bool {
        self.unique
    }

    fn comparator(&self) -> &KeyComparator {
        &self.comparator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_range::KeyRange;
    use alloc::vec;
    use trellis_core::Value;

    fn tree(order: usize, unique: bool) -> BTreeIndex {
        BTreeIndex::with_order("t.idx", unique, KeyComparator::asc(), order)
    }

    fn k(i: i64) -> Key {
        Key::from(i)
    }

    fn range(from: Option<i64>, to: Option<i64>, el: bool, eu: bool) -> IndexRange {
        IndexRange::Single(KeyRange::new(
            from.map(Value::Int64),
            to.map(Value::Int64),
            el,
            eu,
        ))
    }

    fn filled(order: usize, n: i64) -> BTreeIndex {
        let mut t = tree(order, true);
        for i in 0..n {
            t.add(k(i), i as RowId).unwrap();
        }
        t
    }

    #[test]
    fn test_insert_get() {
        let mut t = tree(5, true);
        t.add(k(10), 100).unwrap();
        t.add(k(20), 200).unwrap();
        t.add(k(5), 50).unwrap();
        assert_eq!(t.get(&k(10)), vec![100]);
        assert_eq!(t.get(&k(5)), vec![50]);
        assert!(t.get(&k(15)).is_empty());
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_unique_constraint() {
        let mut t = tree(5, true);
        t.add(k(10), 100).unwrap();
        assert_eq!(t.add(k(10), 101), Err(IndexError::DuplicateKey(k(10))));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_non_unique_keys() {
        let mut t = tree(5, false);
        t.add(k(10), 1).unwrap();
        t.add(k(10), 2).unwrap();
        t.add(k(10), 2).unwrap();
        assert_eq!(t.get(&k(10)), vec![1, 2]);
        assert_eq!(t.len(), 2);

        t.remove(&k(10), Some(1));
        assert_eq!(t.get(&k(10)), vec![2]);
        t.remove(&k(10), None);
        assert!(!t.contains_key(&k(10)));
        assert!(t.is_empty());
    }

    #[test]
    fn test_set_replaces_values() {
        let mut t = tree(5, false);
        t.add(k(1), 1).unwrap();
        t.add(k(1), 2).unwrap();
        t.set(k(1), 9);
        assert_eq!(t.get(&k(1)), vec![9]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_split_and_scan_in_order() {
        let t = filled(4, 200);
        let all = t.get_range(&[], false, None, 0);
        assert_eq!(all, (0..200).collect::<Vec<RowId>>());
        let rev = t.get_range(&[], true, None, 0);
        assert_eq!(rev, (0..200).rev().collect::<Vec<RowId>>());
    }

    #[test]
    fn test_bounded_ranges() {
        let t = filled(4, 50);
        assert_eq!(
            t.get_range(&[range(Some(10), Some(14), false, true)], false, None, 0),
            vec![10, 11, 12, 13]
        );
        assert_eq!(
            t.get_range(&[range(Some(45), None, true, false)], false, None, 0),
            vec![46, 47, 48, 49]
        );
        assert_eq!(
            t.get_range(&[range(None, Some(2), false, false)], true, None, 0),
            vec![2, 1, 0]
        );
        assert!(t
            .get_range(&[range(Some(60), None, false, false)], false, None, 0)
            .is_empty());
    }

    #[test]
    fn test_limit_skip() {
        let t = filled(4, 30);
        assert_eq!(t.get_range(&[], false, Some(3), 5), vec![5, 6, 7]);
        assert_eq!(t.get_range(&[], true, Some(2), 1), vec![28, 27]);
        assert!(t.get_range(&[], false, Some(0), 0).is_empty());
        assert!(t.get_range(&[], false, None, 100).is_empty());
    }

    #[test]
    fn test_multiple_ranges_are_unioned_in_order() {
        let t = filled(4, 40);
        let ranges = [
            range(Some(30), Some(31), false, false),
            range(Some(2), Some(3), false, false),
        ];
        assert_eq!(t.get_range(&ranges, false, None, 0), vec![2, 3, 30, 31]);
        assert_eq!(t.get_range(&ranges, true, None, 0), vec![31, 30, 3, 2]);
        assert_eq!(t.get_range(&ranges, false, Some(3), 1), vec![3, 30, 31]);
    }

    #[test]
    fn test_cost_matches_range_size() {
        let t = filled(4, 100);
        let r = range(Some(10), Some(29), false, false);
        assert_eq!(t.cost(Some(&r)), 20);
        assert_eq!(t.cost(None), 100);
    }

    #[test]
    fn test_descending_index_order() {
        let mut t = BTreeIndex::with_order("t.idxName", false, KeyComparator::desc(), 4);
        t.add(Key::from("a"), 1).unwrap();
        t.add(Key::from("b"), 2).unwrap();
        t.add(Key::from("c"), 3).unwrap();
        assert_eq!(t.get_range(&[], false, None, 0), vec![3, 2, 1]);

        let upto_b = IndexRange::Single(KeyRange::upper_bound(Value::from("b"), false));
        assert_eq!(t.get_range(&[upto_b], false, None, 0), vec![2, 1]);
        assert_eq!(t.min().unwrap().0, Key::from("a"));
        assert_eq!(t.max().unwrap().0, Key::from("c"));
    }

    #[test]
    fn test_delete_rebalances() {
        let mut t = filled(4, 300);
        for i in (0..300).step_by(2) {
            t.remove(&k(i), None);
        }
        let expected: Vec<RowId> = (0..300).filter(|i| i % 2 == 1).collect();
        assert_eq!(t.get_range(&[], false, None, 0), expected);
        let mut rev = expected.clone();
        rev.reverse();
        assert_eq!(t.get_range(&[], true, None, 0), rev);

        for i in (1..300).step_by(2) {
            t.remove(&k(i), None);
        }
        assert!(t.is_empty());
        assert!(t.min().is_none());
        t.add(k(7), 7).unwrap();
        assert_eq!(t.get_range(&[], false, None, 0), vec![7]);
    }

    #[test]
    fn test_delete_reverse_order() {
        let mut t = filled(5, 120);
        for i in (0..120).rev() {
            t.remove(&k(i), Some(i as RowId));
            assert_eq!(t.len(), i as usize);
        }
        assert!(t.get_range(&[], false, None, 0).is_empty());
    }

    #[test]
    fn test_min_max_and_stats() {
        let mut t = filled(4, 10);
        assert_eq!(t.min(), Some((k(0), vec![0])));
        assert_eq!(t.max(), Some((k(9), vec![9])));
        t.remove(&k(9), None);
        assert_eq!(t.stats().max_key_encountered(), Some(&k(9)));
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.stats().max_key_encountered(), None);
    }

    #[test]
    fn test_composite_prefix_range() {
        let mut t = BTreeIndex::with_order(
            "t.idxAB",
            true,
            KeyComparator::new(vec![Order::Asc, Order::Desc]),
            4,
        );
        let mut id = 0;
        for a in 0..5i64 {
            for b in 0..5i64 {
                t.add(Key::from(vec![Value::Int64(a), Value::Int64(b)]), id)
                    .unwrap();
                id += 1;
            }
        }
        let r = IndexRange::Composite(vec![
            KeyRange::only(Value::Int64(2)),
            KeyRange::new(Some(Value::Int64(1)), Some(Value::Int64(3)), false, false),
        ]);
        // a = 2 rows are ids 10..15, b descending within the prefix
        assert_eq!(t.get_range(&[r.clone()], false, None, 0), vec![13, 12, 11]);
        assert_eq!(t.cost(Some(&r)), 3);
    }
}
