//! Logical query plans and their generation from query contexts.

use super::tree::{NodeId, Tree};
use crate::context::{AggregatedColumn, OrderKey, QueryContext, SelectColumn, SelectContext};
use crate::optimizer::Optimizer;
use crate::predicate::{ColumnRef, JoinPredicate, Predicate, TableRef};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use trellis_core::schema::Order;

/// Logical query plan node.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalNode {
    TableAccess(TableRef),
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
}

pub(crate) fn join_columns<T: fmt::Display>(items: &[T]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("{}", item));
    }
    out
}

pub(crate) fn order_keys(keys: &[OrderKey]) -> String {
    let rendered: Vec<String> = keys
        .iter()
        .map(|k| {
            let order = match k.order {
                Order::Asc => "ASC",
                Order::Desc => "DESC",
            };
            format!("{} {}", k.column, order)
        })
        .collect();
    join_columns(&rendered)
}

pub(crate) fn column_names(columns: &[ColumnRef]) -> String {
    let names: Vec<String> = columns.iter().map(ColumnRef::normalized_name).collect();
    join_columns(&names)
}

impl fmt::Display for LogicalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalNode::TableAccess(t) => match &t.alias {
                Some(alias) => write!(f, "table_access({} as {})", t.name, alias),
                None => write!(f, "table_access({})", t.name),
            },
            LogicalNode::Select(p) => write!(f, "select({})", p),
            LogicalNode::CrossProduct => f.write_str("cross_product"),
            LogicalNode::Join { predicate, outer } => {
                let kind = if *outer { "outer" } else { "inner" };
                write!(f, "join(type: {}, {})", kind, predicate)
            }
            LogicalNode::Project { columns, group_by } => {
                write!(f, "project({}", join_columns(columns))?;
                if !group_by.is_empty() {
                    write!(f, ", groupBy({})", column_names(group_by))?;
                }
                f.write_str(")")
            }
            LogicalNode::Aggregation(columns) => {
                let names: Vec<String> = columns.iter().map(AggregatedColumn::name).collect();
                write!(f, "aggregation({})", join_columns(&names))
            }
            LogicalNode::GroupBy(columns) => write!(f, "group_by({})", column_names(columns)),
            LogicalNode::OrderBy(keys) => write!(f, "order_by({})", order_keys(keys)),
            LogicalNode::Limit => f.write_str("limit"),
            LogicalNode::Skip => f.write_str("skip"),
            LogicalNode::Insert(t) => write!(f, "insert({})", t),
            LogicalNode::InsertOrReplace(t) => write!(f, "insert_replace({})", t),
            LogicalNode::Update(t) => write!(f, "update({})", t.name),
            LogicalNode::Delete(t) => write!(f, "delete({})", t.name),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogicalPlan {
    pub tree: Tree<LogicalNode>,
}

impl LogicalPlan {
    pub fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    pub fn explain(&self) -> String {
        self.tree.explain(|n| format!("{}", n))
    }
}

/// Builds the logical plan of one query, once.
pub struct LogicalPlanGenerator<'q> {
    query: &'q QueryContext,
    plan: Option<LogicalPlan>,
}

impl<'q> LogicalPlanGenerator<'q> {
    pub fn new(query: &'q QueryContext) -> Self {
        Self { query, plan: None }
    }

    /// The optimized logical plan. Later calls return the same plan.
    pub fn generate(&mut self) -> &LogicalPlan {
        let query = self.query;
        self.plan.get_or_insert_with(|| {
            let plan = match query {
                QueryContext::Select(s) => generate_select(s),
                QueryContext::Insert(i) => {
                    let mut tree = Tree::new();
                    let node = if i.allow_replace {
                        LogicalNode::InsertOrReplace(i.table.clone())
                    } else {
                        LogicalNode::Insert(i.table.clone())
                    };
                    tree.push(None, node);
                    LogicalPlan { tree }
                }
                QueryContext::Update(u) => generate_write(
                    LogicalNode::Update(u.table.clone()),
                    &u.table,
                    u.where_clause.as_ref(),
                ),
                QueryContext::Delete(d) => generate_write(
                    LogicalNode::Delete(d.from.clone()),
                    &d.from,
                    d.where_clause.as_ref(),
                ),
            };
            Optimizer::for_query(query).optimize(plan, query)
        })
    }
}

fn generate_write(root: LogicalNode, table: &TableRef, predicate: Option<&Predicate>) -> LogicalPlan {
    let mut tree = Tree::new();
    let mut parent = tree.push(None, root);
    if let Some(predicate) = predicate {
        parent = tree.push(Some(parent), LogicalNode::Select(predicate.clone()));
    }
    tree.push(Some(parent), LogicalNode::TableAccess(table.clone()));
    LogicalPlan { tree }
}

fn generate_select(query: &SelectContext) -> LogicalPlan {
    let mut tree = Tree::new();
    let mut parent: Option<NodeId> = None;
    let mut chain = |tree: &mut Tree<LogicalNode>, node: LogicalNode| {
        let id = tree.push(parent, node);
        parent = Some(id);
    };

    if query.limit.is_some() {
        chain(&mut tree, LogicalNode::Limit);
    }
    if query.skip.is_some() {
        chain(&mut tree, LogicalNode::Skip);
    }
    chain(
        &mut tree,
        LogicalNode::Project {
            columns: query.columns.clone(),
            group_by: query.group_by.clone(),
        },
    );
    if !query.order_by.is_empty() {
        chain(&mut tree, LogicalNode::OrderBy(query.order_by.clone()));
    }
    let aggregates: Vec<AggregatedColumn> = dedup(query.aggregates().cloned());
    if !aggregates.is_empty() {
        chain(&mut tree, LogicalNode::Aggregation(aggregates));
    }
    if !query.group_by.is_empty() {
        chain(&mut tree, LogicalNode::GroupBy(query.group_by.clone()));
    }
    if let Some(predicate) = &query.where_clause {
        chain(&mut tree, LogicalNode::Select(predicate.clone()));
    }
    if query.from.len() > 1 {
        chain(&mut tree, LogicalNode::CrossProduct);
    }
    let table_parent = parent;
    for table in &query.from {
        tree.push(table_parent, LogicalNode::TableAccess(table.clone()));
    }
    LogicalPlan { tree }
}

fn dedup(columns: impl Iterator<Item = AggregatedColumn>) -> Vec<AggregatedColumn> {
    let mut out: Vec<AggregatedColumn> = Vec::new();
    for c in columns {
        if !out.iter().any(|o| o.name() == c.name()) {
            out.push(c);
        }
    }
    out
}
