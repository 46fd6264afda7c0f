//! Whole-database export and import.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use trellis_core::schema::{Schema, Table};
use trellis_core::{Error, Row};
use trellis_storage::{Journal, TaskId};

use super::{abort, commit, Task, TaskPriority, TransactionType};
use crate::context::Context;
use crate::convert::{json_to_row, row_to_json};
use crate::error::Result;

/// Plain snapshot of a database: every row of every table, keyed by table
/// name, tagged with the schema name and version it was taken from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDump {
    pub name: String,
    pub version: u32,
    pub tables: BTreeMap<String, Vec<Map<String, Json>>>,
}

fn all_tables(schema: &Schema) -> BTreeSet<String> {
    schema.tables().iter().map(|t| t.name().to_string()).collect()
}

/// Reads every table into a `DatabaseDump`.
pub struct ExportTask {
    id: TaskId,
    scope: BTreeSet<String>,
}

impl ExportTask {
    pub fn new(ctx: &Context) -> Self {
        Self {
            id: ctx.next_task_id(),
            scope: all_tables(ctx.schema()),
        }
    }
}

impl Task for ExportTask {
    type Output = DatabaseDump;

    fn id(&self) -> TaskId {
        self.id
    }

    fn tx_type(&self) -> TransactionType {
        TransactionType::ReadOnly
    }

    fn scope(&self) -> &BTreeSet<String> {
        &self.scope
    }

    fn priority(&self) -> TaskPriority {
        TaskPriority::Export
    }

    fn exec(self, ctx: Rc<Context>) -> LocalBoxFuture<'static, Result<DatabaseDump>> {
        async move {
            let cache = ctx.cache().borrow();
            let tables = ctx
                .schema()
                .tables()
                .iter()
                .map(|table| {
                    let mut rows = cache.rows(table.name());
                    rows.sort_by_key(|row| row.id());
                    let rows = rows.iter().map(|row| row_to_json(row)).collect();
                    (table.name().to_string(), rows)
                })
                .collect();
            Ok(DatabaseDump {
                name: ctx.schema().name().to_string(),
                version: ctx.schema().version(),
                tables,
            })
        }
        .boxed_local()
    }
}

/// Loads a `DatabaseDump` into an empty database.
///
/// The dump must come from a schema with the same name and version. Rows get
/// fresh row ids and go through the usual constraint checks; parents are
/// loaded before the tables referencing them.
pub struct ImportTask {
    id: TaskId,
    scope: BTreeSet<String>,
    dump: DatabaseDump,
}

impl ImportTask {
    pub fn new(ctx: &Context, dump: DatabaseDump) -> Self {
        Self {
            id: ctx.next_task_id(),
            scope: all_tables(ctx.schema()),
            dump,
        }
    }

    fn load(&self, ctx: &Context, journal: &mut Journal<'_>) -> Result<()> {
        let schema = ctx.schema();
        if self.dump.name != schema.name() || self.dump.version != schema.version() {
            return Err(Error::import(format!(
                "dump of {} v{} does not match database {} v{}",
                self.dump.name,
                self.dump.version,
                schema.name(),
                schema.version()
            ))
            .into());
        }
        if ctx.row_count(None) != 0 {
            return Err(Error::import("import requires an empty database").into());
        }
        if let Some(unknown) = self.dump.tables.keys().find(|name| schema.table(name).is_err()) {
            return Err(Error::table_not_found(unknown.as_str()).into());
        }

        let mut cache = ctx.cache().borrow_mut();
        let mut indices = ctx.indices().borrow_mut();
        for table in insertion_order(schema) {
            let Some(objects) = self.dump.tables.get(table.name()) else {
                continue;
            };
            let rows = objects
                .iter()
                .map(|object| json_to_row(object, table, ctx.row_ids().next_id()).map(Rc::new))
                .collect::<trellis_core::Result<Vec<Rc<Row>>>>()?;
            journal.insert(&mut cache, &mut indices, table.name(), rows)?;
        }
        Ok(())
    }
}

impl Task for ImportTask {
    type Output = ();

    fn id(&self) -> TaskId {
        self.id
    }

    fn tx_type(&self) -> TransactionType {
        TransactionType::ReadWrite
    }

    fn scope(&self) -> &BTreeSet<String> {
        &self.scope
    }

    fn priority(&self) -> TaskPriority {
        TaskPriority::Import
    }

    fn exec(self, ctx: Rc<Context>) -> LocalBoxFuture<'static, Result<()>> {
        async move {
            let scope: Vec<&str> = self.scope.iter().map(String::as_str).collect();
            let mut journal = Journal::new(ctx.schema(), &scope);
            if let Err(e) = self.load(&ctx, &mut journal) {
                abort(&ctx, self.id, journal);
                return Err(e);
            }
            commit(&ctx, self.id, journal).await?;
            Ok(())
        }
        .boxed_local()
    }
}

/// Tables ordered so that every table follows the tables it references.
/// Tables caught in a reference cycle keep schema order at the end.
fn insertion_order(schema: &Schema) -> Vec<&Table> {
    let mut placed: BTreeSet<&str> = BTreeSet::new();
    let mut order = Vec::with_capacity(schema.tables().len());
    let mut remaining: Vec<&Table> = schema.tables().iter().collect();
    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&Table>, Vec<&Table>) = remaining.into_iter().partition(|t| {
            schema
                .parent_tables(t.name())
                .iter()
                .all(|p| p.name() == t.name() || placed.contains(p.name()))
        });
        if ready.is_empty() {
            order.extend(blocked);
            break;
        }
        placed.extend(ready.iter().map(|t| t.name()));
        order.extend(ready);
        remaining = blocked;
    }
    order
}
