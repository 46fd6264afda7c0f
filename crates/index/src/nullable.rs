//! Nullable index wrapper.
//!
//! Null keys are kept beside the wrapped index rather than inside it, so a
//! unique index still accepts any number of nulls. Range scans never match
//! nulls; a full scan returns them after the non-null keys.

use crate::comparator::KeyComparator;
use crate::key::Key;
use crate::key_range::IndexRange;
use crate::stats::IndexStats;
use crate::traits::{Index, IndexError};
use alloc::vec::Vec;
use trellis_core::RowId;

/// Wraps a single-column index whose column admits null.
#[derive(Debug)]
pub struct NullableIndex<I: Index> {
    inner: I,
    nulls: Vec<RowId>,
    stats: IndexStats,
}

impl<I: Index> NullableIndex<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            nulls: Vec::new(),
            stats: IndexStats::new(),
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn null_count(&self) -> usize {
        self.nulls.len()
    }

    fn sync_stats(&mut self, key: Option<&Key>, added: usize, removed: usize) {
        if let Some(key) = key {
            self.stats.add(key, added);
        }
        self.stats.remove(removed);
    }
}

impl<I: Index> Index for NullableIndex<I> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn add(&mut self, key: Key, row_id: RowId) -> Result<(), IndexError> {
        if key.is_null() {
            if !self.nulls.contains(&row_id) {
                self.nulls.push(row_id);
                self.stats.add_rows(1);
            }
            return Ok(());
        }
        let before = self.inner.len();
        self.inner.add(key.clone(), row_id)?;
        let added = self.inner.len() - before;
        self.sync_stats(Some(&key), added, 0);
        Ok(())
    }

    fn set(&mut self, key: Key, row_id: RowId) {
        if key.is_null() {
            let removed = self.nulls.len();
            self.nulls.clear();
            self.nulls.push(row_id);
            self.stats.add_rows(1);
            self.stats.remove(removed);
            return;
        }
        let removed = self.inner.get(&key).len();
        self.inner.set(key.clone(), row_id);
        self.sync_stats(Some(&key), 1, removed);
    }

    fn remove(&mut self, key: &Key, row_id: Option<RowId>) {
        let removed = if key.is_null() {
            let before = self.nulls.len();
            match row_id {
                Some(id) => self.nulls.retain(|&x| x != id),
                None => self.nulls.clear(),
            }
            before - self.nulls.len()
        } else {
            let before = self.inner.len();
            self.inner.remove(key, row_id);
            before - self.inner.len()
        };
        self.sync_stats(None, 0, removed);
    }

    fn get(&self, key: &Key) -> Vec<RowId> {
        if key.is_null() {
            self.nulls.clone()
        } else {
            self.inner.get(key)
        }
    }

    fn get_range(
        &self,
        ranges: &[IndexRange],
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId> {
        let full_scan = ranges.is_empty() || ranges.iter().all(IndexRange::is_all);
        if !full_scan {
            return self.inner.get_range(ranges, reverse, limit, skip);
        }
        let mut all = self.inner.get_range(&[], reverse, None, 0);
        all.extend(self.nulls.iter().copied());
        all.into_iter()
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    fn cost(&self, range: Option<&IndexRange>) -> usize {
        match range {
            Some(r) if !r.is_all() => self.inner.cost(Some(r)),
            _ => self.stats.total_rows(),
        }
    }

    fn min(&self) -> Option<(Key, Vec<RowId>)> {
        self.inner.min()
    }

    fn max(&self) -> Option<(Key, Vec<RowId>)> {
        self.inner.max()
    }

    fn contains_key(&self, key: &Key) -> bool {
        if key.is_null() {
            !self.nulls.is_empty()
        } else {
            self.inner.contains_key(key)
        }
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.nulls.clear();
        self.stats.clear();
    }

    fn stats(&self) -> &IndexStats {
        &self.stats
    }

    fn is_unique(&self) -> bool {
        self.inner.is_unique()
    }

    fn comparator(&self) -> &KeyComparator {
        self.inner.comparator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::BTreeIndex;
    use crate::key_range::KeyRange;
    use alloc::vec;
    use trellis_core::Value;

    fn index() -> NullableIndex<BTreeIndex> {
        NullableIndex::new(BTreeIndex::new("t.uqEmail", true, KeyComparator::asc()))
    }

    fn null() -> Key {
        Key::Single(Value::Null)
    }

    #[test]
    fn test_unique_allows_multiple_nulls() {
        let mut idx = index();
        idx.add(null(), 1).unwrap();
        idx.add(null(), 2).unwrap();
        idx.add(Key::from("a"), 3).unwrap();
        assert!(idx.add(Key::from("a"), 4).is_err());
        assert_eq!(idx.get(&null()), vec![1, 2]);
        assert_eq!(idx.len(), 3);
        assert!(idx.contains_key(&null()));
    }

    #[test]
    fn test_ranges_skip_nulls_full_scan_includes_them() {
        let mut idx = index();
        idx.add(Key::from("b"), 2).unwrap();
        idx.add(null(), 9).unwrap();
        idx.add(Key::from("a"), 1).unwrap();

        assert_eq!(idx.get_range(&[], false, None, 0), vec![1, 2, 9]);
        assert_eq!(idx.get_range(&[], false, Some(2), 1), vec![2, 9]);
        let only_a = IndexRange::Single(KeyRange::only(Value::from("a")));
        assert_eq!(idx.get_range(&[only_a.clone()], false, None, 0), vec![1]);
        assert_eq!(idx.cost(Some(&only_a)), 1);
        assert_eq!(idx.cost(None), 3);
    }

    #[test]
    fn test_remove_and_set() {
        let mut idx = index();
        idx.add(null(), 1).unwrap();
        idx.add(null(), 2).unwrap();
        idx.remove(&null(), Some(1));
        assert_eq!(idx.get(&null()), vec![2]);
        idx.set(null(), 5);
        assert_eq!(idx.get(&null()), vec![5]);
        assert_eq!(idx.len(), 1);
        idx.clear();
        assert!(idx.is_empty());
    }
}
