//! Index statistics.

use crate::key::Key;

/// Statistics for an index.
///
/// `total_rows` counts row ids, not distinct keys. `max_key_encountered`
/// only ever grows (until `clear`) and feeds primary key auto-increment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexStats {
    total_rows: usize,
    max_key_encountered: Option<Key>,
}

impl IndexStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn max_key_encountered(&self) -> Option<&Key> {
        self.max_key_encountered.as_ref()
    }

    /// Records `count` row ids added under `key`.
    pub fn add(&mut self, key: &Key, count: usize) {
        self.total_rows += count;
        if self.max_key_encountered.as_ref().map_or(true, |m| key > m) {
            self.max_key_encountered = Some(key.clone());
        }
    }

    /// Records `count` row ids added without a comparable key (e.g. nulls).
    pub fn add_rows(&mut self, count: usize) {
        self.total_rows += count;
    }

    /// Records `count` row ids removed.
    pub fn remove(&mut self, count: usize) {
        self.total_rows = self.total_rows.saturating_sub(count);
    }

    pub fn clear(&mut self) {
        self.total_rows = 0;
        self.max_key_encountered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_add_remove_rows() {
        let mut stats = IndexStats::new();
        stats.add(&Key::from(3i64), 10);
        assert_eq!(stats.total_rows(), 10);
        stats.remove(4);
        assert_eq!(stats.total_rows(), 6);
        stats.remove(100);
        assert_eq!(stats.total_rows(), 0);
    }

    #[test]
    fn test_stats_max_key() {
        let mut stats = IndexStats::new();
        stats.add(&Key::from(100i64), 1);
        stats.add(&Key::from(50i64), 1);
        assert_eq!(stats.max_key_encountered(), Some(&Key::from(100i64)));
        stats.remove(2);
        // removal does not lower the high-water mark
        assert_eq!(stats.max_key_encountered(), Some(&Key::from(100i64)));
        stats.clear();
        assert_eq!(stats.max_key_encountered(), None);
    }
}
