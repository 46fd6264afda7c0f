//! Physical query plans.

use super::logical::{column_names, join_columns, order_keys, LogicalNode, LogicalPlan};
use super::tree::{NodeId, Tree};
use crate::context::{AggregatedColumn, OrderKey, QueryContext, SelectColumn};
use crate::optimizer::{GetRowCountPass, IndexRangeScanPass, LimitSkipByIndexPass, PhysicalPass};
use crate::predicate::{ColumnRef, JoinPredicate, Predicate, TableRef};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use trellis_core::schema::Schema;
use trellis_storage::IndexStore;

/// How many children a node takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    NoChild,
    FirstChild,
    /// Exactly two.
    All,
    Any,
}

impl Arity {
    /// Whether a node of this arity may have `children` inputs.
    pub fn accepts(self, children: usize) -> bool {
        match self {
            Arity::NoChild => children == 0,
            Arity::FirstChild => children == 1,
            Arity::All => children == 2,
            Arity::Any => true,
        }
    }
}

/// Physical query plan node.
#[derive(Clone, Debug, PartialEq)]
pub enum PhysicalNode {
    TableAccessFull(TableRef),
    /// Fetches the rows whose ids the child produced.
    TableAccessByRowId(TableRef),
    IndexRangeScan {
        table: TableRef,
        index: String,
        /// Predicates over the leading index columns.
        predicates: Vec<Predicate>,
        use_limit: bool,
        use_skip: bool,
    },
    Select(Predicate),
    CrossProduct,
    Join {
        predicate: JoinPredicate,
        outer: bool,
    },
    Project {
        columns: Vec<SelectColumn>,
        group_by: Vec<ColumnRef>,
    },
    Aggregation(Vec<AggregatedColumn>),
    GroupBy(Vec<ColumnRef>),
    OrderBy(Vec<OrderKey>),
    Limit,
    Skip,
    Insert(String),
    InsertOrReplace(String),
    Update(TableRef),
    Delete(TableRef),
    GetRowCount(TableRef),
}

impl PhysicalNode {
    pub fn arity(&self) -> Arity {
        match self {
            PhysicalNode::TableAccessFull(_)
            | PhysicalNode::IndexRangeScan { .. }
            | PhysicalNode::Insert(_)
            | PhysicalNode::InsertOrReplace(_)
            | PhysicalNode::GetRowCount(_) => Arity::NoChild,
            PhysicalNode::CrossProduct | PhysicalNode::Join { .. } => Arity::All,
            PhysicalNode::TableAccessByRowId(_)
            | PhysicalNode::Select(_)
            | PhysicalNode::Project { .. }
            | PhysicalNode::Aggregation(_)
            | PhysicalNode::GroupBy(_)
            | PhysicalNode::OrderBy(_)
            | PhysicalNode::Limit
            | PhysicalNode::Skip
            | PhysicalNode::Update(_)
            | PhysicalNode::Delete(_) => Arity::FirstChild,
        }
    }

    fn from_logical(node: &LogicalNode) -> Self {
        match node {
            LogicalNode::TableAccess(t) => PhysicalNode::TableAccessFull(t.clone()),
            LogicalNode::Select(p) => PhysicalNode::Select(p.clone()),
            LogicalNode::CrossProduct => PhysicalNode::CrossProduct,
            LogicalNode::Join { predicate, outer } => PhysicalNode::Join {
                predicate: predicate.clone(),
                outer: *outer,
            },
            LogicalNode::Project { columns, group_by } => PhysicalNode::Project {
                columns: columns.clone(),
                group_by: group_by.clone(),
            },
            LogicalNode::Aggregation(c) => PhysicalNode::Aggregation(c.clone()),
            LogicalNode::GroupBy(c) => PhysicalNode::GroupBy(c.clone()),
            LogicalNode::OrderBy(k) => PhysicalNode::OrderBy(k.clone()),
            LogicalNode::Limit => PhysicalNode::Limit,
            LogicalNode::Skip => PhysicalNode::Skip,
            LogicalNode::Insert(t) => PhysicalNode::Insert(t.clone()),
            LogicalNode::InsertOrReplace(t) => PhysicalNode::InsertOrReplace(t.clone()),
            LogicalNode::Update(t) => PhysicalNode::Update(t.clone()),
            LogicalNode::Delete(t) => PhysicalNode::Delete(t.clone()),
        }
    }
}

impl fmt::Display for PhysicalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalNode::TableAccessFull(t) => write!(f, "table_access({})", t.name),
            PhysicalNode::TableAccessByRowId(t) => write!(f, "table_access_by_row_id({})", t.name),
            PhysicalNode::IndexRangeScan {
                index,
                use_limit,
                use_skip,
                ..
            } => {
                write!(f, "index_range_scan({}", index)?;
                if *use_limit {
                    f.write_str(", limit")?;
                }
                if *use_skip {
                    f.write_str(", skip")?;
                }
                f.write_str(")")
            }
            PhysicalNode::Select(p) => write!(f, "select({})", p),
            PhysicalNode::CrossProduct => f.write_str("cross_product"),
            PhysicalNode::Join { predicate, outer } => {
                let algorithm = if predicate.is_equi_join() { "hash" } else { "nested_loop" };
                let kind = if *outer { "outer" } else { "inner" };
                write!(f, "join(type: {}, impl: {}, {})", kind, algorithm, predicate)
            }
            PhysicalNode::Project { columns, group_by } => {
                write!(f, "project({}", join_columns(columns))?;
                if !group_by.is_empty() {
                    write!(f, ", groupBy({})", column_names(group_by))?;
                }
                f.write_str(")")
            }
            PhysicalNode::Aggregation(columns) => {
                let names: Vec<String> = columns.iter().map(AggregatedColumn::name).collect();
                write!(f, "aggregation({})", join_columns(&names))
            }
            PhysicalNode::GroupBy(columns) => write!(f, "group_by({})", column_names(columns)),
            PhysicalNode::OrderBy(keys) => write!(f, "order_by({})", order_keys(keys)),
            PhysicalNode::Limit => f.write_str("limit"),
            PhysicalNode::Skip => f.write_str("skip"),
            PhysicalNode::Insert(t) => write!(f, "insert({})", t),
            PhysicalNode::InsertOrReplace(t) => write!(f, "insert_replace({})", t),
            PhysicalNode::Update(t) => write!(f, "update({})", t.name),
            PhysicalNode::Delete(t) => write!(f, "delete({})", t.name),
            PhysicalNode::GetRowCount(t) => write!(f, "get_row_count({})", t.name),
        }
    }
}

/// An executable step tree. Run it with `PhysicalPlan::exec`.
#[derive(Clone, Debug, Default)]
pub struct PhysicalPlan {
    pub tree: Tree<PhysicalNode>,
}

impl PhysicalPlan {
    pub fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    pub fn explain(&self) -> String {
        self.tree.explain(|n| format!("{}", n))
    }

    /// First reachable node whose child count breaks its arity.
    pub fn arity_violation(&self) -> Option<NodeId> {
        self.tree.pre_order().into_iter().find(|id| {
            let children = self.tree.children(*id).len();
            !self.tree.get(*id).arity().accepts(children)
        })
    }
}

/// Toggles for the optional physical rewrites.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannerOptions {
    pub enable_row_count_pass: bool,
    pub enable_limit_skip_pass: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            enable_row_count_pass: true,
            enable_limit_skip_pass: true,
        }
    }
}

/// Lowers logical plans to physical ones, choosing index scans from the
/// current index statistics.
pub struct PhysicalPlanFactory<'a> {
    schema: &'a Schema,
    indices: &'a IndexStore,
    options: PlannerOptions,
}

impl<'a> PhysicalPlanFactory<'a> {
    pub fn new(schema: &'a Schema, indices: &'a IndexStore, options: PlannerOptions) -> Self {
        Self {
            schema,
            indices,
            options,
        }
    }

    pub fn create(&self, logical: &LogicalPlan, query: &QueryContext) -> PhysicalPlan {
        let mut plan = PhysicalPlan::default();
        if let Some(root) = logical.root() {
            let id = lower(&logical.tree, root, &mut plan.tree);
            plan.tree.set_root(id);
        }

        let mut passes: Vec<Box<dyn PhysicalPass + '_>> = Vec::new();
        match query {
            QueryContext::Select(_) => {
                passes.push(Box::new(IndexRangeScanPass::new(self.schema, self.indices)));
                if self.options.enable_limit_skip_pass {
                    passes.push(Box::new(LimitSkipByIndexPass));
                }
                if self.options.enable_row_count_pass {
                    passes.push(Box::new(GetRowCountPass));
                }
            }
            QueryContext::Update(_) | QueryContext::Delete(_) => {
                passes.push(Box::new(IndexRangeScanPass::new(self.schema, self.indices)));
            }
            QueryContext::Insert(_) => {}
        }
        for pass in passes {
            plan = pass.optimize(plan, query);
        }
        debug_assert!(
            plan.arity_violation().is_none(),
            "physical plan breaks an arity contract:\n{}",
            plan.explain()
        );
        plan
    }
}

fn lower(logical: &Tree<LogicalNode>, id: NodeId, out: &mut Tree<PhysicalNode>) -> NodeId {
    let node = out.add(PhysicalNode::from_logical(logical.get(id)));
    for child in logical.children(id) {
        let lowered = lower(logical, *child, out);
        out.add_child(node, lowered);
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AggregatedColumn, DeleteContext, SelectContext};
    use crate::planner::LogicalPlanGenerator;
    use alloc::vec;
    use trellis_core::schema::{Order, TableBuilder};
    use trellis_core::DataType;

    fn schema() -> Schema {
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
        Schema::new("db", 1, vec![t]).unwrap()
    }

    fn compile(schema: &Schema, query: &QueryContext, options: PlannerOptions) -> PhysicalPlan {
        let mut indices = IndexStore::new();
        indices.init(schema);
        let mut generator = LogicalPlanGenerator::new(query);
        PhysicalPlanFactory::new(schema, &indices, options).create(generator.generate(), query)
    }

    #[test]
    fn test_index_scan_replaces_select() {
        let schema = schema();
        let t = TableRef::new("t");
        let query: QueryContext = SelectContext::new()
            .from(t.clone())
            .filter(t.col("name").equals("b"))
            .filter(t.col("name").matches("^b"))
            .into();
        let plan = compile(&schema, &query, PlannerOptions::default());
        assert_eq!(
            plan.explain(),
            "project()\n\
             -select(t.name match ^b)\n\
             --table_access_by_row_id(t)\n\
             ---index_range_scan(t.idxName)\n"
        );
    }

    #[test]
    fn test_count_star_uses_row_count() {
        let schema = schema();
        let query: QueryContext = SelectContext::new()
            .from("t")
            .column(AggregatedColumn::count_star())
            .into();
        let plan = compile(&schema, &query, PlannerOptions::default());
        assert_eq!(plan.explain(), "project(COUNT(*))\n-get_row_count(t)\n");

        let disabled = PlannerOptions {
            enable_row_count_pass: false,
            ..PlannerOptions::default()
        };
        let plan = compile(&schema, &query, disabled);
        assert_eq!(
            plan.explain(),
            "project(COUNT(*))\n-aggregation(COUNT(*))\n--table_access(t)\n"
        );
    }

    #[test]
    fn test_limit_folds_into_index_scan() {
        let schema = schema();
        let t = TableRef::new("t");
        let query: QueryContext = SelectContext::new()
            .from(t.clone())
            .filter(t.col("id").gt(3))
            .limit(2)
            .skip(1)
            .into();
        let plan = compile(&schema, &query, PlannerOptions::default());
        assert_eq!(
            plan.explain(),
            "project()\n\
             -table_access_by_row_id(t)\n\
             --index_range_scan(t.pkT, limit, skip)\n"
        );
    }

    #[test]
    fn test_delete_uses_index() {
        let schema = schema();
        let t = TableRef::new("t");
        let query: QueryContext = DeleteContext::new(t.clone()).filter(t.col("id").equals(1)).into();
        let plan = compile(&schema, &query, PlannerOptions::default());
        assert_eq!(
            plan.explain(),
            "delete(t)\n-table_access_by_row_id(t)\n--index_range_scan(t.pkT)\n"
        );
        assert_eq!(plan.tree.get(plan.root().unwrap()).arity(), Arity::FirstChild);
        assert_eq!(plan.arity_violation(), None);
    }

    #[test]
    fn test_arity_violation_is_found() {
        let mut plan = PhysicalPlan::default();
        let root = plan.tree.add(PhysicalNode::CrossProduct);
        plan.tree.set_root(root);
        let left = plan.tree.add(PhysicalNode::TableAccessFull(TableRef::new("t")));
        plan.tree.add_child(root, left);
        assert_eq!(plan.arity_violation(), Some(root));

        let right = plan.tree.add(PhysicalNode::TableAccessFull(TableRef::new("u")));
        plan.tree.add_child(root, right);
        assert_eq!(plan.arity_violation(), None);

        assert!(Arity::NoChild.accepts(0));
        assert!(!Arity::FirstChild.accepts(2));
        assert!(Arity::Any.accepts(5));
    }
}
