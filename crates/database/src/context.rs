//! Per-connection state shared by the runner and every task.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::trace;
use trellis_core::schema::Schema;
use trellis_core::{Error, RowIdGenerator};
use trellis_query::{
    ExecContext, LogicalPlanGenerator, PhysicalPlan, PhysicalPlanFactory, QueryContext, Relation,
};
use trellis_storage::{Cache, IndexStore, Journal, LockManager, TaskId};

use crate::back_store::BackStore;
use crate::error::Result;
use crate::options::ConnectOptions;

const TARGET: &str = "trellis::database::context";

/// Everything one connection owns.
///
/// Tasks receive the context through an `Rc`; the cache, index store and
/// lock table sit behind `RefCell`s that are never borrowed across an await.
pub struct Context {
    schema: Schema,
    cache: RefCell<Cache>,
    indices: RefCell<IndexStore>,
    locks: RefCell<LockManager>,
    back_store: Rc<dyn BackStore>,
    row_ids: RowIdGenerator,
    task_ids: Cell<TaskId>,
    options: ConnectOptions,
}

impl Context {
    pub fn new(schema: Schema, back_store: Rc<dyn BackStore>, options: ConnectOptions) -> Self {
        let mut indices = IndexStore::with_order(options.btree_order);
        indices.init(&schema);
        Self {
            schema,
            cache: RefCell::new(Cache::new()),
            indices: RefCell::new(indices),
            locks: RefCell::new(LockManager::new()),
            back_store,
            row_ids: RowIdGenerator::new(1),
            task_ids: Cell::new(1),
            options,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    pub fn back_store(&self) -> &Rc<dyn BackStore> {
        &self.back_store
    }

    pub fn row_ids(&self) -> &RowIdGenerator {
        &self.row_ids
    }

    pub fn next_task_id(&self) -> TaskId {
        let id = self.task_ids.get();
        self.task_ids.set(id + 1);
        id
    }

    /// Number of committed rows in `table`, or in every table.
    pub fn row_count(&self, table: Option<&str>) -> usize {
        self.cache.borrow().count(table)
    }

    pub(crate) fn cache(&self) -> &RefCell<Cache> {
        &self.cache
    }

    pub(crate) fn indices(&self) -> &RefCell<IndexStore> {
        &self.indices
    }

    pub(crate) fn locks(&self) -> &RefCell<LockManager> {
        &self.locks
    }

    /// Checks `query` and compiles it against the current index statistics.
    pub fn compile(&self, query: &QueryContext) -> Result<PhysicalPlan> {
        query.validate(&self.schema)?;
        if !query.is_bound() {
            return Err(Error::invalid_query("query has unbound parameters").into());
        }
        let mut generator = LogicalPlanGenerator::new(query);
        let indices = self.indices.borrow();
        let factory = PhysicalPlanFactory::new(&self.schema, &indices, self.options.planner_options());
        let plan = factory.create(generator.generate(), query);
        trace!(target: TARGET, plan = %plan.explain(), "Compiled query");
        Ok(plan)
    }

    /// Tables `query` touches, foreign-key neighbours included.
    pub fn scope(&self, query: &QueryContext) -> Result<BTreeSet<String>> {
        Ok(query.scope(&self.schema)?)
    }

    /// Runs a compiled plan. Writes go through `journal`.
    pub(crate) fn exec(
        &self,
        plan: &PhysicalPlan,
        query: &QueryContext,
        journal: Option<&mut Journal<'_>>,
    ) -> Result<Relation> {
        let mut cache = self.cache.borrow_mut();
        let mut indices = self.indices.borrow_mut();
        let mut ctx = ExecContext {
            schema: &self.schema,
            cache: &mut *cache,
            indices: &mut *indices,
            journal,
            row_ids: &self.row_ids,
        };
        Ok(plan.exec(&mut ctx, query)?)
    }

    /// Undoes everything `journal` applied.
    pub(crate) fn rollback(&self, journal: Journal<'_>) {
        let mut cache = self.cache.borrow_mut();
        let mut indices = self.indices.borrow_mut();
        journal.rollback(&mut cache, &mut indices);
    }
}
