//! Per-transaction write path.
//!
//! A `Journal` applies writes to the cache and indices as soon as they pass
//! their constraint checks. The owning task holds exclusive locks on every
//! table of the journal's scope, so no other task observes the uncommitted
//! state. Each mutation is recorded twice: in the per-table `TableDiff` handed
//! out on commit, and in an ordered entry log replayed backwards on rollback.

use crate::cache::Cache;
use crate::constraint::ConstraintChecker;
use crate::index_store::{key_of_row, IndexStore};
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::schema::{ConstraintAction, ForeignKey, Schema, Table};
use trellis_core::{Error, Result, Row, RowId, Value};
use trellis_index::{IndexError, Key, RowIdIndex};

/// Net effect of a transaction on one table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableDiff {
    name: String,
    added: BTreeMap<RowId, Rc<Row>>,
    modified: BTreeMap<RowId, (Rc<Row>, Rc<Row>)>,
    deleted: BTreeMap<RowId, Rc<Row>>,
}

impl TableDiff {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records an insertion. Re-adding a deleted row turns into a modification.
    pub fn add(&mut self, row: Rc<Row>) {
        let id = row.id();
        match self.deleted.remove(&id) {
            Some(old) => {
                self.modified.insert(id, (old, row));
            }
            None => {
                self.added.insert(id, row);
            }
        }
    }

    /// Records an update, keeping the oldest known version as `old`.
    pub fn modify(&mut self, old: Rc<Row>, new: Rc<Row>) {
        let id = old.id();
        if let Some(added) = self.added.get_mut(&id) {
            *added = new;
        } else if let Some((_, current)) = self.modified.get_mut(&id) {
            *current = new;
        } else {
            self.modified.insert(id, (old, new));
        }
    }

    /// Records a deletion. Deleting a row added in the same diff cancels out.
    pub fn delete(&mut self, row: Rc<Row>) {
        let id = row.id();
        if self.added.remove(&id).is_some() {
            return;
        }
        match self.modified.remove(&id) {
            Some((original, _)) => {
                self.deleted.insert(id, original);
            }
            None => {
                self.deleted.insert(id, row);
            }
        }
    }

    pub fn added(&self) -> &BTreeMap<RowId, Rc<Row>> {
        &self.added
    }

    pub fn modified(&self) -> &BTreeMap<RowId, (Rc<Row>, Rc<Row>)> {
        &self.modified
    }

    pub fn deleted(&self) -> &BTreeMap<RowId, Rc<Row>> {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// The diff that undoes this one.
    pub fn reverse(&self) -> Self {
        Self {
            name: self.name.clone(),
            added: self.deleted.clone(),
            modified: self
                .modified
                .iter()
                .map(|(id, (old, new))| (*id, (new.clone(), old.clone())))
                .collect(),
            deleted: self.added.clone(),
        }
    }

    /// Flattens the diff into `(before, after)` pairs.
    pub fn modifications(&self) -> Vec<(Option<Rc<Row>>, Option<Rc<Row>>)> {
        let added = self.added.values().map(|r| (None, Some(r.clone())));
        let modified = self
            .modified
            .values()
            .map(|(old, new)| (Some(old.clone()), Some(new.clone())));
        let deleted = self.deleted.values().map(|r| (Some(r.clone()), None));
        added.chain(modified).chain(deleted).collect()
    }
}

/// One applied mutation, in application order.
#[derive(Clone, Debug)]
enum JournalEntry {
    Insert { table: String, row: Rc<Row> },
    Update { table: String, old: Rc<Row>, new: Rc<Row> },
    Delete { table: String, row: Rc<Row> },
}

/// Write journal of a single transaction.
#[derive(Debug)]
pub struct Journal<'a> {
    schema: &'a Schema,
    scope: BTreeSet<String>,
    diffs: BTreeMap<String, TableDiff>,
    entries: Vec<JournalEntry>,
}

impl<'a> Journal<'a> {
    /// Creates a journal allowed to write the tables in `scope`.
    pub fn new<S: AsRef<str>>(schema: &'a Schema, scope: &[S]) -> Self {
        Self {
            schema,
            scope: scope.iter().map(|s| String::from(s.as_ref())).collect(),
            diffs: BTreeMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn scope(&self) -> impl Iterator<Item = &str> {
        self.scope.iter().map(|s| s.as_str())
    }

    pub fn diff(&self, table: &str) -> Option<&TableDiff> {
        self.diffs.get(table)
    }

    /// Whether no mutation has been applied yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts new rows. Row ids must not be in use.
    pub fn insert(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        table: &str,
        rows: Vec<Rc<Row>>,
    ) -> Result<()> {
        let table = self.writable_table(table)?;
        for row in rows {
            self.insert_row(cache, indices, table, row)?;
        }
        Ok(())
    }

    /// Inserts rows, replacing any existing row with the same primary key.
    ///
    /// A replaced row keeps its original row id.
    pub fn insert_or_replace(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        table: &str,
        rows: Vec<Rc<Row>>,
    ) -> Result<()> {
        let table = self.writable_table(table)?;
        let pk = table
            .primary_key()
            .ok_or_else(|| Error::missing_primary_key(table.name()))?;
        let pk_name = pk.normalized_name();
        for row in rows {
            let existing = indices
                .get(&pk_name)
                .ok_or_else(|| Error::index_not_found(pk_name.as_str()))?
                .get(&key_of_row(pk, &row))
                .first()
                .copied();
            match existing {
                Some(id) => self.update_row(cache, indices, table, Rc::new(row.with_id(id)))?,
                None => self.insert_row(cache, indices, table, row)?,
            }
        }
        Ok(())
    }

    /// Replaces existing rows, matched by row id.
    pub fn update(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        table: &str,
        rows: Vec<Rc<Row>>,
    ) -> Result<()> {
        let table = self.writable_table(table)?;
        for row in rows {
            self.update_row(cache, indices, table, row)?;
        }
        Ok(())
    }

    /// Deletes rows, matched by row id. Rows already gone are skipped.
    pub fn remove(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        table: &str,
        rows: Vec<Rc<Row>>,
    ) -> Result<()> {
        let table = self.writable_table(table)?;
        for row in rows {
            self.remove_row(cache, indices, table, row.id())?;
        }
        Ok(())
    }

    /// Replays a diff committed elsewhere, e.g. by another connection to the
    /// same backing store.
    ///
    /// The diff already passed constraint checks where it was committed, so
    /// rows go straight into the cache and indexes: no foreign-key checks and
    /// no cascades. Diffs of FK-linked tables can be applied in any order.
    pub fn apply_diff(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        diff: &TableDiff,
    ) -> Result<()> {
        let table = self.writable_table(diff.name())?;
        let upserts = diff
            .added()
            .values()
            .chain(diff.modified().values().map(|(_, new)| new));
        for row in upserts {
            let old = cache.get(table.name(), row.id());
            self.modify_row(cache, indices, table, old, Some(row.clone()))?;
        }
        for id in diff.deleted().keys() {
            if let Some(row) = cache.get(table.name(), *id) {
                self.modify_row(cache, indices, table, Some(row), None)?;
            }
        }
        Ok(())
    }

    /// Finishes the transaction, returning the non-empty diffs.
    pub fn commit(self) -> Vec<TableDiff> {
        self.diffs.into_values().filter(|d| !d.is_empty()).collect()
    }

    /// Undoes every applied mutation, newest first.
    pub fn rollback(self, cache: &mut Cache, indices: &mut IndexStore) {
        for entry in self.entries.into_iter().rev() {
            let (table, before, after) = match entry {
                JournalEntry::Insert { table, row } => (table, Some(row), None),
                JournalEntry::Update { table, old, new } => (table, Some(new), Some(old)),
                JournalEntry::Delete { table, row } => (table, None, Some(row)),
            };
            let Ok(def) = self.schema.table(&table) else {
                continue;
            };
            let restored = update_indices(indices, def, before.as_deref(), after.as_deref());
            debug_assert!(restored.is_ok(), "rollback could not restore {}", table);
            match after {
                Some(row) => cache.set(&table, row),
                None => {
                    if let Some(row) = before {
                        cache.remove(&table, row.id());
                    }
                }
            }
        }
    }

    fn writable_table(&self, name: &str) -> Result<&'a Table> {
        let table = self.schema.table(name)?;
        if !self.scope.contains(name) {
            return Err(Error::invalid_operation(format!(
                "Table {} is outside the transaction scope",
                name
            )));
        }
        Ok(table)
    }

    fn insert_row(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        table: &Table,
        row: Rc<Row>,
    ) -> Result<()> {
        ConstraintChecker::check_not_null(table, &row)?;
        ConstraintChecker::check_types(table, &row)?;
        ConstraintChecker::check_references_exist(self.schema, indices, table, &row)?;
        self.modify_row(cache, indices, table, None, Some(row))
    }

    fn update_row(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        table: &'a Table,
        row: Rc<Row>,
    ) -> Result<()> {
        let old = cache.get(table.name(), row.id()).ok_or_else(|| {
            Error::invalid_operation(format!("Row {} not found in {}", row.id(), table.name()))
        })?;
        ConstraintChecker::check_not_null(table, &row)?;
        ConstraintChecker::check_types(table, &row)?;
        ConstraintChecker::check_changed_references_exist(self.schema, indices, table, &old, &row)?;

        let schema = self.schema;
        let changed: Vec<&'a ForeignKey> = schema
            .referencing_foreign_keys(table.name())
            .filter(|fk| old.get_or_null(&fk.parent_column) != row.get_or_null(&fk.parent_column))
            .collect();
        for fk in &changed {
            if fk.action == ConstraintAction::Restrict
                && ConstraintChecker::is_referenced(indices, fk, &old)?
            {
                return Err(Error::foreign_key(
                    &fk.name,
                    format!(
                        "{} is still referenced by {}.{}",
                        old.get_or_null(&fk.parent_column),
                        fk.child_table,
                        fk.child_column
                    ),
                ));
            }
        }

        self.modify_row(cache, indices, table, Some(old.clone()), Some(row.clone()))?;

        for fk in changed {
            if fk.action != ConstraintAction::Cascade {
                continue;
            }
            let child = self.writable_table(&fk.child_table)?;
            let new_value = row.get_or_null(&fk.parent_column).clone();
            for id in referencing_rows(indices, fk, &old)? {
                if let Some(current) = cache.get(child.name(), id) {
                    let mut updated = (*current).clone();
                    updated.set(fk.child_column.as_str(), new_value.clone());
                    self.update_row(cache, indices, child, Rc::new(updated))?;
                }
            }
        }
        Ok(())
    }

    fn remove_row(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        table: &'a Table,
        id: RowId,
    ) -> Result<()> {
        let Some(row) = cache.get(table.name(), id) else {
            return Ok(());
        };
        let schema = self.schema;
        for fk in schema.referencing_foreign_keys(table.name()) {
            if fk.action != ConstraintAction::Cascade {
                continue;
            }
            let child = self.writable_table(&fk.child_table)?;
            for child_id in referencing_rows(indices, fk, &row)? {
                self.remove_row(cache, indices, child, child_id)?;
            }
        }
        ConstraintChecker::check_not_referenced(schema, indices, table, &row)?;
        self.modify_row(cache, indices, table, Some(row), None)
    }

    fn modify_row(
        &mut self,
        cache: &mut Cache,
        indices: &mut IndexStore,
        table: &Table,
        before: Option<Rc<Row>>,
        after: Option<Rc<Row>>,
    ) -> Result<()> {
        update_indices(indices, table, before.as_deref(), after.as_deref())?;

        let name = table.name();
        let diff = self
            .diffs
            .entry(String::from(name))
            .or_insert_with(|| TableDiff::new(name));
        let entry = match (before, after) {
            (None, Some(row)) => {
                cache.set(name, row.clone());
                diff.add(row.clone());
                JournalEntry::Insert { table: String::from(name), row }
            }
            (Some(old), Some(new)) => {
                cache.set(name, new.clone());
                diff.modify(old.clone(), new.clone());
                JournalEntry::Update { table: String::from(name), old, new }
            }
            (Some(row), None) => {
                cache.remove(name, row.id());
                diff.delete(row.clone());
                JournalEntry::Delete { table: String::from(name), row }
            }
            (None, None) => return Ok(()),
        };
        self.entries.push(entry);
        Ok(())
    }
}

/// Row ids of the child rows pointing at `parent` through `fk`.
fn referencing_rows(indices: &IndexStore, fk: &ForeignKey, parent: &Row) -> Result<Vec<RowId>> {
    let value = parent.get_or_null(&fk.parent_column);
    if value.is_null() {
        return Ok(Vec::new());
    }
    let name = fk.child_index_name();
    let index = indices
        .get(&name)
        .ok_or_else(|| Error::index_not_found(name.as_str()))?;
    Ok(index.get(&Key::Single(value.clone())))
}

/// Moves a row from `before` to `after` in every index of `table`.
///
/// Either every index is updated or, on a unique violation, none is.
fn update_indices(
    indices: &mut IndexStore,
    table: &Table,
    before: Option<&Row>,
    after: Option<&Row>,
) -> Result<()> {
    let row_id_index = table.row_id_index_name();
    let mut targets: Vec<(String, Option<Key>, Option<Key>)> = table
        .indices()
        .iter()
        .map(|def| {
            (
                def.normalized_name(),
                before.map(|r| key_of_row(def, r)),
                after.map(|r| key_of_row(def, r)),
            )
        })
        .collect();
    targets.push((
        row_id_index,
        before.map(|r| RowIdIndex::key(r.id())),
        after.map(|r| RowIdIndex::key(r.id())),
    ));
    if let Some((name, _, _)) = targets.iter().find(|(name, _, _)| indices.get(name).is_none()) {
        return Err(Error::index_not_found(name.as_str()));
    }

    let old_id = before.map(|r| r.id());
    let new_id = after.map(|r| r.id());
    for (done, (name, old_key, new_key)) in targets.iter().enumerate() {
        if let Err(err) = move_entry(indices, name, (old_key, old_id), (new_key, new_id)) {
            for (name, old_key, new_key) in targets[..done].iter().rev() {
                let _ = move_entry(indices, name, (new_key, new_id), (old_key, old_id));
            }
            return Err(err);
        }
    }
    Ok(())
}

fn move_entry(
    indices: &mut IndexStore,
    name: &str,
    from: (&Option<Key>, Option<RowId>),
    to: (&Option<Key>, Option<RowId>),
) -> Result<()> {
    let index = indices
        .get_mut(name)
        .ok_or_else(|| Error::index_not_found(name))?;
    let (from_key, from_id) = from;
    let (to_key, to_id) = to;
    if from_key == to_key && from_id == to_id {
        return Ok(());
    }
    if let (Some(key), Some(id)) = (from_key, from_id) {
        index.remove(key, Some(id));
    }
    if let (Some(key), Some(id)) = (to_key, to_id) {
        if let Err(IndexError::DuplicateKey(dup)) = index.add(key.clone(), id) {
            if let (Some(key), Some(id)) = (from_key, from_id) {
                let _ = index.add(key.clone(), id);
            }
            return Err(Error::unique_constraint(name, key_value(dup)));
        }
    }
    Ok(())
}

fn key_value(key: Key) -> Value {
    match key {
        Key::Single(value) => value,
        Key::Composite(values) => {
            let parts: Vec<String> = values.iter().map(|v| format!("{}", v)).collect();
            Value::String(format!("[{}]", parts.join(", ")))
        }
    }
}
