//! Registry of every index in a database.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::schema::{IndexDef, Schema, Table};
use trellis_core::{Row, Value};
use trellis_index::btree::DEFAULT_ORDER;
use trellis_index::{BTreeIndex, Index, Key, KeyComparator, NullableIndex, RowIdIndex};

/// Owns the indices of all tables, addressed by normalized name
/// (`table.index`, `table.#` for the row-id index).
#[derive(Debug)]
pub struct IndexStore {
    indices: BTreeMap<String, Box<dyn Index>>,
    table_indices: BTreeMap<String, Vec<String>>,
    btree_order: usize,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore {
    pub fn new() -> Self {
        Self::with_order(DEFAULT_ORDER)
    }

    /// Creates a store whose B+trees use the given fan-out.
    pub fn with_order(btree_order: usize) -> Self {
        Self {
            indices: BTreeMap::new(),
            table_indices: BTreeMap::new(),
            btree_order,
        }
    }

    /// Builds empty indices for every table in `schema`.
    ///
    /// Any index registered earlier is dropped.
    pub fn init(&mut self, schema: &Schema) {
        self.indices.clear();
        self.table_indices.clear();
        for table in schema.tables() {
            self.init_table(table);
        }
    }

    fn init_table(&mut self, table: &Table) {
        for def in table.indices() {
            let index = self.build_index(table, def);
            self.set(table.name(), index);
        }
        self.set(table.name(), Box::new(RowIdIndex::new(table.row_id_index_name())));
    }

    fn build_index(&self, table: &Table, def: &IndexDef) -> Box<dyn Index> {
        let comparator = KeyComparator::new(def.columns().iter().map(|c| c.order).collect());
        let btree = BTreeIndex::with_order(
            def.normalized_name(),
            def.is_unique(),
            comparator,
            self.btree_order,
        );
        let nullable = def.is_single_column()
            && def.has_nullable_column(|col| {
                table.get_column(col).map_or(false, |c| c.is_nullable())
            });
        if nullable {
            Box::new(NullableIndex::new(btree))
        } else {
            Box::new(btree)
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Index> {
        self.indices.get(name).map(|i| i.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Index + 'static)> {
        self.indices.get_mut(name).map(|i| i.as_mut())
    }

    /// Registers `index` for `table`, replacing any index with the same name.
    pub fn set(&mut self, table: &str, index: Box<dyn Index>) {
        let name = String::from(index.name());
        let names = self.table_indices.entry(String::from(table)).or_default();
        if !names.contains(&name) {
            names.push(name.clone());
        }
        self.indices.insert(name, index);
    }

    /// Every index of `table`, the row-id index last.
    pub fn table_indices(&self, table: &str) -> Vec<&dyn Index> {
        self.table_indices
            .get(table)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| self.indices.get(n).map(|i| i.as_ref()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn row_id_index(&self, table: &Table) -> Option<&dyn Index> {
        self.get(&table.row_id_index_name())
    }

    /// Clears the contents of every index, keeping their definitions.
    pub fn clear(&mut self) {
        for index in self.indices.values_mut() {
            index.clear();
        }
    }
}

/// Key of `row` in the index described by `def`.
///
/// Missing columns read as null.
pub fn key_of_row(def: &IndexDef, row: &Row) -> Key {
    let columns = def.columns();
    if columns.len() == 1 {
        Key::Single(row.get_or_null(&columns[0].name).clone())
    } else {
        Key::Composite(
            columns
                .iter()
                .map(|c| row.get_or_null(&c.name).clone())
                .collect::<Vec<Value>>(),
        )
    }
}
