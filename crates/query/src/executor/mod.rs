//! Query executor module.
//!
//! `PhysicalPlan::exec` walks the step tree bottom-up. Every step consumes
//! and produces a list of relations: usually one, several after a GROUP BY.

mod aggregate;
mod filter;
pub mod join;
mod limit;
mod modify;
mod project;
mod relation;
mod scan;
mod sort;

pub use aggregate::{AggregateExecutor, GroupByExecutor};
pub use filter::FilterExecutor;
pub use join::{CrossProduct, HashJoin, NestedLoopJoin};
pub use limit::LimitExecutor;
pub use modify::{DeleteExecutor, InsertExecutor, UpdateExecutor};
pub use project::ProjectExecutor;
pub use relation::{Relation, RelationEntry};
pub use scan::{IndexScanExecutor, RowIdFetchExecutor, TableScanExecutor};
pub use sort::SortExecutor;

use crate::context::{AggregatedColumn, QueryContext};
use crate::planner::{NodeId, PhysicalNode, PhysicalPlan};
use crate::predicate::Predicate;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use trellis_core::schema::Schema;
use trellis_core::{Error, Result, RowIdGenerator, Value};
use trellis_storage::{Cache, IndexStore, Journal};

/// Everything a plan needs to run.
///
/// Read-only plans run without a journal; a write step then fails.
pub struct ExecContext<'a, 'j> {
    pub schema: &'a Schema,
    pub cache: &'a mut Cache,
    pub indices: &'a mut IndexStore,
    pub journal: Option<&'a mut Journal<'j>>,
    pub row_ids: &'a RowIdGenerator,
}

impl<'a, 'j> ExecContext<'a, 'j> {
    /// Splits the context into the pieces a write needs.
    pub fn writer(&mut self) -> Result<(&mut Journal<'j>, &mut Cache, &mut IndexStore)> {
        let journal = self
            .journal
            .as_deref_mut()
            .ok_or_else(|| Error::invalid_operation("write step outside a read-write transaction"))?;
        Ok((journal, &mut *self.cache, &mut *self.indices))
    }
}

impl PhysicalPlan {
    /// Runs the plan for `query`, which must be the bound query the plan was
    /// created from.
    pub fn exec(&self, ctx: &mut ExecContext<'_, '_>, query: &QueryContext) -> Result<Relation> {
        let Some(root) = self.root() else {
            return Ok(Relation::empty());
        };
        let output = self.exec_node(root, ctx, query)?;
        Ok(merge(output))
    }

    fn exec_node(
        &self,
        id: NodeId,
        ctx: &mut ExecContext<'_, '_>,
        query: &QueryContext,
    ) -> Result<Vec<Relation>> {
        let tree = &self.tree;
        let node = tree.get(id);
        let inputs = tree.children(id).len();
        assert!(
            node.arity().accepts(inputs),
            "step {} takes {:?} inputs, has {}",
            node,
            node.arity(),
            inputs
        );
        let output = match node {
            PhysicalNode::TableAccessFull(table) => {
                vec![TableScanExecutor::new(table).execute(ctx.cache)]
            }
            PhysicalNode::TableAccessByRowId(table) => {
                let ids = merge(self.exec_input(id, 0, ctx, query)?);
                vec![RowIdFetchExecutor::new(table).execute(ctx.cache, &ids)]
            }
            PhysicalNode::IndexRangeScan {
                table,
                index,
                predicates,
                use_limit,
                use_skip,
            } => {
                let predicates: Vec<Predicate> = predicates
                    .iter()
                    .map(|p| resolve(query, p).clone())
                    .collect();
                let limit = if *use_limit { query.limit() } else { None };
                let skip = if *use_skip { query.skip() } else { None };
                let scan = IndexScanExecutor::new(table, index, &predicates).with_limit(limit, skip);
                vec![scan.execute(ctx.schema, ctx.indices)?]
            }
            PhysicalNode::Select(predicate) => {
                let filter = FilterExecutor::new(resolve(query, predicate));
                self.exec_input(id, 0, ctx, query)?.iter().map(|r| filter.execute(r)).collect()
            }
            PhysicalNode::CrossProduct => {
                let left = merge(self.exec_input(id, 0, ctx, query)?);
                let right = merge(self.exec_input(id, 1, ctx, query)?);
                vec![CrossProduct::execute(&left, &right)]
            }
            PhysicalNode::Join { predicate, outer } => {
                let predicate = match query.find_predicate(predicate.id()).and_then(Predicate::as_join) {
                    Some(bound) => bound,
                    None => predicate,
                };
                let left = merge(self.exec_input(id, 0, ctx, query)?);
                let right = merge(self.exec_input(id, 1, ctx, query)?);
                vec![predicate.eval_relations(&left, &right, *outer)]
            }
            PhysicalNode::Project { columns, group_by } => {
                let input = self.exec_input(id, 0, ctx, query)?;
                vec![ProjectExecutor::new(columns, group_by).execute(input)]
            }
            PhysicalNode::Aggregation(columns) => {
                AggregateExecutor::new(columns).execute(self.exec_input(id, 0, ctx, query)?)
            }
            PhysicalNode::GroupBy(columns) => {
                let relation = merge(self.exec_input(id, 0, ctx, query)?);
                GroupByExecutor::new(columns).execute(&relation)
            }
            PhysicalNode::OrderBy(keys) => {
                SortExecutor::new(keys).execute(self.exec_input(id, 0, ctx, query)?)
            }
            PhysicalNode::Limit => {
                let relation = merge(self.exec_input(id, 0, ctx, query)?);
                vec![LimitExecutor::new(query.limit(), 0).execute(relation)]
            }
            PhysicalNode::Skip => {
                let relation = merge(self.exec_input(id, 0, ctx, query)?);
                vec![LimitExecutor::new(None, query.skip().unwrap_or(0)).execute(relation)]
            }
            PhysicalNode::Insert(_) | PhysicalNode::InsertOrReplace(_) => match query {
                QueryContext::Insert(insert) => vec![InsertExecutor::new(insert).execute(ctx)?],
                _ => return Err(mismatch(tree.get(id))),
            },
            PhysicalNode::Update(_) => match query {
                QueryContext::Update(update) => {
                    let relation = merge(self.exec_input(id, 0, ctx, query)?);
                    vec![UpdateExecutor::new(update).execute(ctx, &relation)?]
                }
                _ => return Err(mismatch(tree.get(id))),
            },
            PhysicalNode::Delete(table) => {
                let relation = merge(self.exec_input(id, 0, ctx, query)?);
                vec![DeleteExecutor::new(&table.name).execute(ctx, relation)?]
            }
            PhysicalNode::GetRowCount(table) => {
                let def = ctx.schema.table(&table.name)?;
                let count = match ctx.indices.row_id_index(def) {
                    Some(index) => index.stats().total_rows(),
                    None => ctx.cache.count(Some(def.name())),
                };
                let mut relation = Relation::new(Vec::new(), vec![String::from(table.effective_name())]);
                relation.set_aggregation(AggregatedColumn::count_star().name(), Value::Int64(count as i64));
                vec![relation]
            }
        };
        Ok(output)
    }

    /// Runs input `index` of a step whose arity was checked on dispatch.
    fn exec_input(
        &self,
        id: NodeId,
        index: usize,
        ctx: &mut ExecContext<'_, '_>,
        query: &QueryContext,
    ) -> Result<Vec<Relation>> {
        self.exec_node(self.tree.children(id)[index], ctx, query)
    }
}

/// The bound copy of a plan predicate, if the query still holds it.
fn resolve<'p>(query: &'p QueryContext, predicate: &'p Predicate) -> &'p Predicate {
    query.find_predicate(predicate.id()).unwrap_or(predicate)
}

fn mismatch(node: &PhysicalNode) -> Error {
    Error::invalid_query(format!("step {} does not match the query", node))
}

/// Concatenates relations, keeping the first one's tables and aggregations.
fn merge(relations: Vec<Relation>) -> Relation {
    let mut relations = relations.into_iter();
    let Some(mut merged) = relations.next() else {
        return Relation::empty();
    };
    for rest in relations {
        merged.entries.extend(rest.entries);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AggregateFunc, DeleteContext, InsertContext, SelectContext, UpdateContext};
    use crate::planner::{LogicalPlanGenerator, PhysicalPlanFactory, PlannerOptions};
    use crate::predicate::{ColumnRef, TableRef};
    use trellis_core::schema::{Order, TableBuilder};
    use trellis_core::{DataType, Row};

    fn schema() -> Schema {
        let t = TableBuilder::new("t")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("kind", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_ordered_index("idxName", &[("name", Order::Desc)], false)
            .unwrap()
            .build()
            .unwrap();
        let u = TableBuilder::new("u")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("t_id", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap();
        Schema::new("db", 1, vec![t, u]).unwrap()
    }

    struct Fixture {
        schema: Schema,
        cache: Cache,
        indices: IndexStore,
        row_ids: RowIdGenerator,
    }

    impl Fixture {
        fn new() -> Self {
            let schema = schema();
            let mut indices = IndexStore::new();
            indices.init(&schema);
            let mut fixture = Self {
                schema,
                cache: Cache::new(),
                indices,
                row_ids: RowIdGenerator::new(1),
            };
            let names = ["a", "b", "c", "d"];
            let rows = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    Row::builder(0)
                        .set("id", i as i64 + 1)
                        .set("name", *name)
                        .set("kind", i as i64 % 2)
                        .build()
                })
                .collect();
            fixture.run(InsertContext::new("t", rows).into()).unwrap();
            let rows = vec![
                Row::builder(0).set("id", 10i64).set("t_id", 1i64).build(),
                Row::builder(0).set("id", 11i64).set("t_id", 1i64).build(),
                Row::builder(0).set("id", 12i64).set("t_id", 3i64).build(),
            ];
            fixture.run(InsertContext::new("u", rows).into()).unwrap();
            fixture
        }

        fn plan(&self, query: &QueryContext) -> PhysicalPlan {
            let mut generator = LogicalPlanGenerator::new(query);
            PhysicalPlanFactory::new(&self.schema, &self.indices, PlannerOptions::default())
                .create(generator.generate(), query)
        }

        fn run(&mut self, query: QueryContext) -> Result<Relation> {
            let plan = self.plan(&query);
            let scope = query.scope(&self.schema)?;
            let mut journal = Journal::new(&self.schema, &scope.iter().collect::<Vec<_>>());
            let mut ctx = ExecContext {
                schema: &self.schema,
                cache: &mut self.cache,
                indices: &mut self.indices,
                journal: Some(&mut journal),
                row_ids: &self.row_ids,
            };
            let result = plan.exec(&mut ctx, &query)?;
            journal.commit();
            Ok(result)
        }

        fn select(&mut self, query: SelectContext) -> Relation {
            let query: QueryContext = query.into();
            let plan = self.plan(&query);
            let mut ctx = ExecContext {
                schema: &self.schema,
                cache: &mut self.cache,
                indices: &mut self.indices,
                journal: None,
                row_ids: &self.row_ids,
            };
            plan.exec(&mut ctx, &query).unwrap()
        }
    }

    #[test]
    #[should_panic(expected = "inputs")]
    fn test_step_with_missing_input_panics() {
        let mut f = Fixture::new();
        let mut plan = PhysicalPlan::default();
        let root = plan.tree.add(PhysicalNode::Limit);
        plan.tree.set_root(root);
        let query: QueryContext = SelectContext::new().from("t").limit(1).into();
        let mut ctx = ExecContext {
            schema: &f.schema,
            cache: &mut f.cache,
            indices: &mut f.indices,
            journal: None,
            row_ids: &f.row_ids,
        };
        let _ = plan.exec(&mut ctx, &query);
    }

    fn names(relation: &Relation) -> Vec<String> {
        relation
            .iter()
            .map(|e| format!("{}", e.get_field(&ColumnRef::new("t", "name"))))
            .collect()
    }

    #[test]
    fn test_index_scan_in_index_order() {
        let mut f = Fixture::new();
        let t = TableRef::new("t");
        let result = f.select(SelectContext::new().from(t.clone()).filter(t.col("name").gte("b")));
        assert_eq!(names(&result), vec!["d", "c", "b"]);
    }

    #[test]
    fn test_count_star_from_row_count() {
        let mut f = Fixture::new();
        let result = f.select(SelectContext::new().from("t").column(AggregatedColumn::count_star()));
        assert_eq!(result.len(), 1);
        assert_eq!(result.entries[0].row.get("COUNT(*)"), Some(&Value::Int64(4)));
    }

    #[test]
    fn test_limit_and_skip_through_index() {
        let mut f = Fixture::new();
        let t = TableRef::new("t");
        let query = SelectContext::new()
            .from(t.clone())
            .filter(t.col("id").gt(0))
            .limit(2)
            .skip(1);
        let result = f.select(query);
        assert_eq!(result.row_ids(), vec![2, 3]);
    }

    #[test]
    fn test_group_order_and_aggregate() {
        let mut f = Fixture::new();
        let t = TableRef::new("t");
        let count = AggregatedColumn::count_star();
        let max = AggregatedColumn::new(AggregateFunc::Max, t.col("name"));
        let query = SelectContext::new()
            .from(t.clone())
            .column(t.col("kind"))
            .column(max.clone())
            .group_by(t.col("kind"))
            .order_by(max.clone(), Order::Desc)
            .column(count);
        let result = f.select(query);
        let max_names: Vec<&Value> = result.iter().filter_map(|e| e.row.get(&max.name())).collect();
        assert_eq!(max_names, vec![&Value::from("d"), &Value::from("c")]);
        assert_eq!(result.entries[0].row.get("COUNT(*)"), Some(&Value::Int64(2)));
    }

    #[test]
    fn test_join() {
        let mut f = Fixture::new();
        let t = TableRef::new("t");
        let u = TableRef::new("u");
        let query = SelectContext::new()
            .from(t.clone())
            .inner_join(u.clone(), t.col("id").join_eq(&u.col("t_id")));
        assert_eq!(f.select(query).len(), 3);

        let query = SelectContext::new()
            .from(t.clone())
            .left_outer_join(u.clone(), t.col("id").join_eq(&u.col("t_id")));
        assert_eq!(f.select(query).len(), 5);
    }

    #[test]
    fn test_update_and_delete() {
        let mut f = Fixture::new();
        let t = TableRef::new("t");
        let updated = f
            .run(UpdateContext::new(t.clone()).set("kind", 9i64).filter(t.col("id").lt(3)).into())
            .unwrap();
        assert_eq!(updated.len(), 2);
        let nines = f.select(SelectContext::new().from(t.clone()).filter(t.col("kind").equals(9i64)));
        assert_eq!(nines.len(), 2);

        f.run(DeleteContext::new(t.clone()).filter(t.col("name").equals("a")).into())
            .unwrap();
        let mut rest = names(&f.select(SelectContext::new().from(t.clone())));
        rest.sort();
        assert_eq!(rest, vec!["b", "c", "d"]);
        assert_eq!(f.indices.get("t.idxName").map(|i| i.len()), Some(3));
    }

    #[test]
    fn test_write_in_read_only_context_fails() {
        let mut f = Fixture::new();
        let query: QueryContext = DeleteContext::new("t").into();
        let plan = f.plan(&query);
        let mut ctx = ExecContext {
            schema: &f.schema,
            cache: &mut f.cache,
            indices: &mut f.indices,
            journal: None,
            row_ids: &f.row_ids,
        };
        assert!(plan.exec(&mut ctx, &query).is_err());
        assert_eq!(f.cache.count(Some("t")), 4);
    }

    #[test]
    fn test_rollback_restores_rows() {
        let mut f = Fixture::new();
        let query: QueryContext = DeleteContext::new("t").into();
        let plan = f.plan(&query);
        let mut journal = Journal::new(&f.schema, &["t", "u"]);
        let mut ctx = ExecContext {
            schema: &f.schema,
            cache: &mut f.cache,
            indices: &mut f.indices,
            journal: Some(&mut journal),
            row_ids: &f.row_ids,
        };
        plan.exec(&mut ctx, &query).unwrap();
        assert_eq!(f.cache.count(Some("t")), 0);
        journal.rollback(&mut f.cache, &mut f.indices);
        assert_eq!(f.cache.count(Some("t")), 4);
    }
}
