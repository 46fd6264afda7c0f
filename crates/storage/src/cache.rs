//! Committed row cache.
//!
//! `Cache` maps `(table, row id)` to the current version of each row. Rows are
//! shared as `Rc<Row>` so relations and journal diffs can hold them without
//! copying payloads.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::{Row, RowId};

#[cfg(feature = "hash-store")]
type RowMap = hashbrown::HashMap<RowId, Rc<Row>>;
#[cfg(not(feature = "hash-store"))]
type RowMap = BTreeMap<RowId, Rc<Row>>;

/// Row cache for every table of a database.
#[derive(Debug, Default)]
pub struct Cache {
    tables: BTreeMap<String, RowMap>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `row` under its id, replacing any previous version.
    pub fn set(&mut self, table: &str, row: Rc<Row>) {
        self.table_mut(table).insert(row.id(), row);
    }

    pub fn set_many(&mut self, table: &str, rows: impl IntoIterator<Item = Rc<Row>>) {
        let map = self.table_mut(table);
        for row in rows {
            map.insert(row.id(), row);
        }
    }

    pub fn get(&self, table: &str, id: RowId) -> Option<Rc<Row>> {
        self.tables.get(table).and_then(|m| m.get(&id)).cloned()
    }

    /// Looks up several rows; missing ids yield `None` in place.
    pub fn get_many(&self, table: &str, ids: &[RowId]) -> Vec<Option<Rc<Row>>> {
        match self.tables.get(table) {
            Some(map) => ids.iter().map(|id| map.get(id).cloned()).collect(),
            None => ids.iter().map(|_| None).collect(),
        }
    }

    /// Rows of `table` whose ids fall in `[from, to]`, ordered by id.
    ///
    /// `None` leaves the corresponding side unbounded.
    pub fn get_range(&self, table: &str, from: Option<RowId>, to: Option<RowId>) -> Vec<Rc<Row>> {
        let Some(map) = self.tables.get(table) else {
            return Vec::new();
        };
        let lo = from.unwrap_or(RowId::MIN);
        let hi = to.unwrap_or(RowId::MAX);
        if lo > hi {
            return Vec::new();
        }
        #[cfg(not(feature = "hash-store"))]
        {
            map.range(lo..=hi).map(|(_, r)| r.clone()).collect()
        }
        #[cfg(feature = "hash-store")]
        {
            let mut rows: Vec<Rc<Row>> = map
                .iter()
                .filter(|(id, _)| **id >= lo && **id <= hi)
                .map(|(_, r)| r.clone())
                .collect();
            rows.sort_by_key(|r| r.id());
            rows
        }
    }

    /// Every row of `table`, ordered by id.
    pub fn rows(&self, table: &str) -> Vec<Rc<Row>> {
        self.get_range(table, None, None)
    }

    pub fn remove(&mut self, table: &str, id: RowId) -> Option<Rc<Row>> {
        self.tables.get_mut(table).and_then(|m| m.remove(&id))
    }

    pub fn remove_many(&mut self, table: &str, ids: &[RowId]) {
        if let Some(map) = self.tables.get_mut(table) {
            for id in ids {
                map.remove(id);
            }
        }
    }

    /// Row count of one table, or of every table when `table` is `None`.
    pub fn count(&self, table: Option<&str>) -> usize {
        match table {
            Some(name) => self.tables.get(name).map_or(0, |m| m.len()),
            None => self.tables.values().map(|m| m.len()).sum(),
        }
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    fn table_mut(&mut self, table: &str) -> &mut RowMap {
        self.tables.entry(String::from(table)).or_default()
    }
}
