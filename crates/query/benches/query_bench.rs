//! Benchmarks for query planning and execution.
//!
//! Setup runs outside the measured closure via `iter_batched`; input rows
//! are shuffled so sorts and index builds do not see presorted data.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use trellis_core::schema::{Order, Schema, TableBuilder};
use trellis_core::{DataType, Row, RowIdGenerator};
use trellis_query::executor::{FilterExecutor, SortExecutor};
use trellis_query::{
    ExecContext, InsertContext, LogicalPlanGenerator, OrderKey, PhysicalPlanFactory,
    PlannerOptions, QueryContext, Relation, SelectColumn, SelectContext, TableRef,
};
use trellis_storage::{Cache, IndexStore, Journal};

/// Simple LCG for reproducible shuffling.
fn shuffle_indices(count: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..count).collect();
    let mut s = seed;
    for i in (1..count).rev() {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        let j = (s as usize) % (i + 1);
        indices.swap(i, j);
    }
    indices
}

fn shuffled_rows(count: usize) -> Vec<Row> {
    shuffle_indices(count, 12345)
        .into_iter()
        .map(|i| {
            Row::builder(0)
                .set("id", i as i64)
                .set("name", format!("name_{}", i))
                .set("score", (i % 100) as i64)
                .build()
        })
        .collect()
}

fn schema() -> Schema {
    let t = TableBuilder::new("t")
        .unwrap()
        .add_column("id", DataType::Int64)
        .unwrap()
        .add_column("name", DataType::String)
        .unwrap()
        .add_column("score", DataType::Int64)
        .unwrap()
        .add_primary_key(&["id"], false)
        .unwrap()
        .add_ordered_index("idxScore", &[("score", Order::Asc)], false)
        .unwrap()
        .build()
        .unwrap();
    Schema::new("bench", 1, vec![t]).unwrap()
}

struct Loaded {
    schema: Schema,
    cache: Cache,
    indices: IndexStore,
    row_ids: RowIdGenerator,
}

fn load(count: usize) -> Loaded {
    let schema = schema();
    let mut cache = Cache::new();
    let mut indices = IndexStore::new();
    indices.init(&schema);
    let row_ids = RowIdGenerator::new(1);
    let query: QueryContext = InsertContext::new("t", shuffled_rows(count)).into();
    let mut generator = LogicalPlanGenerator::new(&query);
    let plan = PhysicalPlanFactory::new(&schema, &indices, PlannerOptions::default())
        .create(generator.generate(), &query);
    {
        let mut journal = Journal::new(&schema, &["t"]);
        let mut ctx = ExecContext {
            schema: &schema,
            cache: &mut cache,
            indices: &mut indices,
            journal: Some(&mut journal),
            row_ids: &row_ids,
        };
        plan.exec(&mut ctx, &query).unwrap();
        journal.commit();
    }
    Loaded {
        schema,
        cache,
        indices,
        row_ids,
    }
}

fn relation(count: usize) -> Relation {
    let rows = shuffled_rows(count)
        .into_iter()
        .enumerate()
        .map(|(i, row)| Rc::new(row.with_id(i as u64)))
        .collect();
    Relation::from_rows(rows, "t")
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let predicate = TableRef::new("t").col("score").lt(50i64);
    for size in [1000, 10000].iter() {
        let input = relation(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(FilterExecutor::new(&predicate).execute(&input)))
        });
    }
    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");
    let keys = vec![OrderKey {
        column: SelectColumn::from(TableRef::new("t").col("name")),
        order: Order::Desc,
    }];
    for size in [1000, 10000].iter() {
        let input = relation(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter_batched(
                || vec![input.clone()],
                |input| black_box(SortExecutor::new(&keys).execute(input)),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    let loaded = load(10000);
    let t = TableRef::new("t");
    let query: QueryContext = SelectContext::new()
        .from(t.clone())
        .filter(t.col("score").between(10i64, 20i64))
        .filter(t.col("name").matches("^name_1"))
        .order_by(t.col("id"), Order::Asc)
        .into();
    c.bench_function("plan_select", |b| {
        b.iter(|| {
            let mut generator = LogicalPlanGenerator::new(&query);
            let factory =
                PhysicalPlanFactory::new(&loaded.schema, &loaded.indices, PlannerOptions::default());
            black_box(factory.create(generator.generate(), &query))
        })
    });
}

fn bench_index_vs_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_10000");
    let mut loaded = load(10000);
    let t = TableRef::new("t");
    let queries: [(&str, QueryContext); 2] = [
        (
            "index_range",
            SelectContext::new()
                .from(t.clone())
                .filter(t.col("score").between(10i64, 12i64))
                .into(),
        ),
        (
            "full_scan",
            SelectContext::new()
                .from(t.clone())
                .filter(t.col("name").matches("^name_1"))
                .into(),
        ),
    ];

    for (label, query) in &queries {
        let mut generator = LogicalPlanGenerator::new(query);
        let plan = PhysicalPlanFactory::new(&loaded.schema, &loaded.indices, PlannerOptions::default())
            .create(generator.generate(), query);
        group.bench_function(*label, |b| {
            b.iter(|| {
                let mut ctx = ExecContext {
                    schema: &loaded.schema,
                    cache: &mut loaded.cache,
                    indices: &mut loaded.indices,
                    journal: None,
                    row_ids: &loaded.row_ids,
                };
                black_box(plan.exec(&mut ctx, query).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_filter,
    bench_sort,
    bench_plan,
    bench_index_vs_full_scan,
);

criterion_main!(benches);
