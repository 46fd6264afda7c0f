//! Database - main entry point for queries and whole-database operations.
//!
//! A `Database` owns one runner. Every query is compiled eagerly, so schema
//! and binding errors surface when the query is submitted; the returned
//! future resolves once the runner has granted the locks and the task has
//! run.

use std::future::Future;
use std::rc::Rc;

use futures::future::FutureExt;
use futures::task::LocalSpawn;
use serde_json::Value as Json;
use tracing::debug;
use trellis_core::schema::Schema;
use trellis_core::Error;
use trellis_query::{
    DeleteContext, InsertContext, QueryContext, Relation, SelectContext, UpdateContext,
};
use trellis_storage::TableDiff;

use crate::back_store::BackStore;
use crate::context::Context;
use crate::error::{DatabaseError, Result};
use crate::options::ConnectOptions;
use crate::runner::{Runner, TaskHandle};
use crate::task::{
    DatabaseDump, ExportTask, ExternalChangeTask, ImportTask, QueryTask, Task, TaskPriority,
};

const TARGET: &str = "trellis::database";

/// A connection to one schema.
///
/// ```
/// use std::rc::Rc;
/// use futures::executor::LocalPool;
/// use trellis_core::schema::{Schema, TableBuilder};
/// use trellis_core::DataType;
/// use trellis_database::{ConnectOptions, Database, MemoryBackStore};
/// use trellis_query::{SelectContext, TableRef};
///
/// let table = TableBuilder::new("t").unwrap()
///     .add_column("id", DataType::Int64).unwrap()
///     .build().unwrap();
/// let schema = Schema::new("db", 1, vec![table]).unwrap();
///
/// let mut pool = LocalPool::new();
/// let connect = Database::connect(
///     schema,
///     Rc::new(MemoryBackStore::new()),
///     ConnectOptions::default(),
///     pool.spawner(),
/// );
/// let db = pool.run_until(connect).unwrap();
/// let rows = pool
///     .run_until(db.select(SelectContext::new().from(TableRef::new("t"))).unwrap())
///     .unwrap();
/// assert!(rows.is_empty());
/// ```
pub struct Database {
    runner: Rc<Runner>,
}

impl Database {
    /// Initializes the back store for `schema` and opens a connection whose
    /// tasks are spawned on `spawner`.
    pub async fn connect(
        schema: Schema,
        back_store: Rc<dyn BackStore>,
        options: ConnectOptions,
        spawner: impl LocalSpawn + 'static,
    ) -> Result<Self> {
        back_store.init(&schema).await?;
        let name = schema.name().to_string();
        let context = Rc::new(Context::new(schema, Rc::clone(&back_store), options));
        let runner = Runner::new(context, spawner);

        let weak = Rc::downgrade(&runner);
        back_store.subscribe(Rc::new(move |diffs: &[TableDiff]| {
            if let Some(runner) = weak.upgrade() {
                let task = ExternalChangeTask::new(runner.context(), diffs.to_vec());
                drop(runner.schedule(task));
            }
        }));
        debug!(target: TARGET, database = %name, "Connected");
        Ok(Self { runner })
    }

    pub fn schema(&self) -> &Schema {
        self.runner.context().schema()
    }

    pub fn context(&self) -> &Rc<Context> {
        self.runner.context()
    }

    pub fn runner(&self) -> &Rc<Runner> {
        &self.runner
    }

    pub fn select(&self, query: SelectContext) -> Result<impl Future<Output = Result<Relation>>> {
        self.query(query)
    }

    pub fn insert(&self, query: InsertContext) -> Result<impl Future<Output = Result<Relation>>> {
        self.query(query)
    }

    pub fn update(&self, query: UpdateContext) -> Result<impl Future<Output = Result<Relation>>> {
        self.query(query)
    }

    pub fn delete(&self, query: DeleteContext) -> Result<impl Future<Output = Result<Relation>>> {
        self.query(query)
    }

    /// Compiles and schedules a single query as a user query.
    pub fn query(
        &self,
        query: impl Into<QueryContext>,
    ) -> Result<impl Future<Output = Result<Relation>>> {
        self.ensure_open()?;
        let task = QueryTask::new(self.context(), vec![query.into()], TaskPriority::UserQuery)?;
        let handle = self.runner.schedule(task);
        Ok(handle.map(|result| result.map(|mut relations| relations.pop().unwrap_or_default())))
    }

    pub fn create_transaction(&self) -> Transaction<'_> {
        Transaction { db: self }
    }

    /// Snapshots every table.
    pub fn export(&self) -> TaskHandle<DatabaseDump> {
        self.runner.schedule(ExportTask::new(self.context()))
    }

    /// Loads a snapshot into this database, which must be empty.
    pub fn import(&self, dump: DatabaseDump) -> TaskHandle<()> {
        self.runner.schedule(ImportTask::new(self.context(), dump))
    }

    /// Like `import`, for a snapshot in its JSON form.
    pub fn import_json(&self, json: Json) -> Result<TaskHandle<()>> {
        let dump: DatabaseDump =
            serde_json::from_value(json).map_err(|e| Error::import(e.to_string()))?;
        Ok(self.import(dump))
    }

    /// Stops the runner and detaches from the back store. Queued tasks are
    /// cancelled; later calls fail with `DatabaseError::Closed`.
    pub fn close(&self) {
        self.runner.close();
        self.context().back_store().unsubscribe();
        debug!(target: TARGET, database = %self.schema().name(), "Closed");
    }

    pub fn is_closed(&self) -> bool {
        self.runner.is_closed()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.runner.is_closed() {
            return Err(DatabaseError::Closed);
        }
        Ok(())
    }
}

/// A group of queries committed or rolled back together.
pub struct Transaction<'db> {
    db: &'db Database,
}

impl Transaction<'_> {
    /// Compiles `queries` and runs them in order under one journal. Any
    /// failure rolls back the effects of the earlier queries.
    pub fn exec(self, queries: Vec<QueryContext>) -> Result<TaskHandle<Vec<Relation>>> {
        self.db.ensure_open()?;
        let task = QueryTask::new(self.db.context(), queries, TaskPriority::Transaction)?;
        debug!(target: TARGET, task = task.id(), queries = task.len(), "Transaction submitted");
        Ok(self.db.runner.schedule(task))
    }
}
