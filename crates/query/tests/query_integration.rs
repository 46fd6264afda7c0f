//! End-to-end tests: plan a query, run it, check the rows.

use trellis_core::schema::{Order, Schema, TableBuilder};
use trellis_core::{DataType, Row, RowIdGenerator, Value};
use trellis_query::{
    AggregatedColumn, ExecContext, InsertContext, LogicalPlanGenerator, PhysicalPlan,
    PhysicalPlanFactory, PlannerOptions, QueryContext, Relation, SelectContext, TableRef,
};
use trellis_storage::{Cache, IndexStore, Journal};

struct Db {
    schema: Schema,
    cache: Cache,
    indices: IndexStore,
    row_ids: RowIdGenerator,
}

impl Db {
    fn new() -> Self {
        let t = TableBuilder::new("t")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_ordered_index("idxName", &[("name", Order::Desc)], false)
            .unwrap()
            .build()
            .unwrap();
        let schema = Schema::new("db", 1, vec![t]).unwrap();
        let mut indices = IndexStore::new();
        indices.init(&schema);
        Self {
            schema,
            cache: Cache::new(),
            indices,
            row_ids: RowIdGenerator::new(1),
        }
    }

    fn plan(&self, query: &QueryContext) -> PhysicalPlan {
        let mut generator = LogicalPlanGenerator::new(query);
        PhysicalPlanFactory::new(&self.schema, &self.indices, PlannerOptions::default())
            .create(generator.generate(), query)
    }

    fn exec(&mut self, query: QueryContext) -> Relation {
        let plan = self.plan(&query);
        let mut journal = Journal::new(&self.schema, &["t"]);
        let mut ctx = ExecContext {
            schema: &self.schema,
            cache: &mut self.cache,
            indices: &mut self.indices,
            journal: Some(&mut journal),
            row_ids: &self.row_ids,
        };
        let result = plan.exec(&mut ctx, &query).unwrap();
        journal.commit();
        result
    }

    fn insert(&mut self, rows: &[(i64, &str)]) -> Relation {
        let rows = rows
            .iter()
            .map(|(id, name)| Row::builder(0).set("id", *id).set("name", *name).build())
            .collect();
        self.exec(InsertContext::new("t", rows).into())
    }
}

#[test]
fn count_star_uses_row_count() {
    let mut db = Db::new();
    db.insert(&[(1, "a"), (2, "b")]);

    let query: QueryContext = SelectContext::new()
        .from("t")
        .column(AggregatedColumn::count_star())
        .into();
    assert_eq!(db.plan(&query).explain(), "project(COUNT(*))\n-get_row_count(t)\n");

    let result = db.exec(query);
    assert_eq!(result.len(), 1);
    assert_eq!(result.entries[0].row.get("COUNT(*)"), Some(&Value::Int64(2)));
}

#[test]
fn descending_index_full_range() {
    let mut db = Db::new();
    let inserted = db.insert(&[(1, "a"), (2, "b"), (3, "c")]);
    let ids = inserted.row_ids();

    let index = db.indices.get("t.idxName").unwrap();
    assert_eq!(index.get_range(&[], false, None, 0), vec![ids[2], ids[1], ids[0]]);
    assert_eq!(index.get_range(&[], true, None, 0), ids);
}

#[test]
fn bound_parameters_drive_index_lookup() {
    let mut db = Db::new();
    db.insert(&[(1, "a"), (2, "b"), (3, "c")]);

    let t = TableRef::new("t");
    let mut query: QueryContext = SelectContext::new()
        .from(t.clone())
        .filter(t.col("id").eq_param(0))
        .into();
    query.bind(&[Value::Int64(2)]).unwrap();
    assert!(db.plan(&query).explain().contains("index_range_scan(t.pkT)"));

    let result = db.exec(query);
    assert_eq!(result.len(), 1);
    assert_eq!(result.entries[0].row.get("name"), Some(&Value::from("b")));
}

#[test]
fn contradictory_range_returns_nothing() {
    let mut db = Db::new();
    db.insert(&[(1, "a"), (2, "b"), (3, "c")]);

    let t = TableRef::new("t");
    let query = SelectContext::new()
        .from(t.clone())
        .filter(t.col("id").gt(2))
        .filter(t.col("id").lt(2));
    assert!(db.exec(query.into()).is_empty());
}

#[test]
fn self_join_through_aliases() {
    let mut db = Db::new();
    db.insert(&[(1, "a"), (2, "b"), (3, "b")]);

    let left = TableRef::new("t").alias("l");
    let right = TableRef::new("t").alias("r");
    let query = SelectContext::new()
        .from(left.clone())
        .inner_join(right.clone(), left.col("name").join_eq(&right.col("name")));
    let result = db.exec(query.into());
    assert_eq!(result.len(), 5);
    assert!(result.is_prefix_applied());
    assert!(result
        .iter()
        .all(|e| e.row.get("l.name") == e.row.get("r.name")));
}
