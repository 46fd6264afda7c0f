//! Push-down selections pass - moves Select nodes towards the table accesses
//! they filter.
//!
//! A select is moved below cross products and joins into the smallest
//! subtree that still produces every table its predicate reads, so that it
//! filters rows before they are multiplied:
//!
//! ```text
//! Select(a.x > 1)                    CrossProduct
//!       |                             /        \
//!   CrossProduct          =>    Select(a.x > 1)  TableAccess(b)
//!    /        \                       |
//! TableAccess(a) TableAccess(b)  TableAccess(a)
//! ```
//!
//! Value predicates on the null-padded side of an outer join stay above the
//! join: they must see the padded rows.

use crate::context::QueryContext;
use crate::optimizer::OptimizerPass;
use crate::planner::tree::{NodeId, Tree};
use crate::planner::{LogicalNode, LogicalPlan};
use crate::predicate::Predicate;
use alloc::collections::BTreeSet;
use alloc::string::String;

/// Pass that pushes selections down the plan tree.
pub struct PushDownSelectionsPass;

impl OptimizerPass for PushDownSelectionsPass {
    fn optimize(&self, mut plan: LogicalPlan, query: &QueryContext) -> LogicalPlan {
        let nullable = nullable_tables(query);
        let selects = plan.tree.find(|n| matches!(n, LogicalNode::Select(_)));
        for id in selects {
            let (tables, is_join) = match plan.tree.get(id) {
                LogicalNode::Select(p) => (p.tables(), p.as_join().is_some()),
                _ => continue,
            };
            if !is_join && tables.iter().any(|t| nullable.contains(t)) {
                continue;
            }
            let Some(start) = plan.tree.child(id, 0) else {
                continue;
            };
            let target = find_target(&plan.tree, start, &tables);
            if target != start {
                let node = plan.tree.remove_node(id);
                let moved = plan.tree.add(node);
                plan.tree.insert_above(target, moved);
            }
        }
        plan
    }

    fn name(&self) -> &'static str {
        "push_down_selections"
    }
}

/// Walks down from `start` through selects, cross products and joins while a
/// single child still covers `tables`.
fn find_target(tree: &Tree<LogicalNode>, start: NodeId, tables: &BTreeSet<String>) -> NodeId {
    let mut current = start;
    loop {
        let next = match tree.get(current) {
            LogicalNode::Select(_) => tree.child(current, 0),
            LogicalNode::CrossProduct | LogicalNode::Join { .. } => tree
                .children(current)
                .iter()
                .copied()
                .find(|c| tables.is_subset(&subtree_tables(tree, *c))),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return current,
        }
    }
}

/// Effective names of the tables accessed below `id`.
pub(crate) fn subtree_tables(tree: &Tree<LogicalNode>, id: NodeId) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut stack = alloc::vec![id];
    while let Some(n) = stack.pop() {
        if let LogicalNode::TableAccess(t) = tree.get(n) {
            out.insert(String::from(t.effective_name()));
        }
        stack.extend(tree.children(n).iter().copied());
    }
    out
}

/// Tables padded with nulls by an outer join: the side of each outer join
/// predicate that joins the FROM list later.
fn nullable_tables(query: &QueryContext) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let Some(select) = query.as_select() else {
        return out;
    };
    let position = |table: &str| select.from.iter().position(|t| t.effective_name() == table);
    for id in &select.outer_join_predicates {
        if let Some(Predicate::Join(j)) = query.find_predicate(*id) {
            let (l, r) = (position(&j.left.table), position(&j.right.table));
            let padded = if l > r { &j.left.table } else { &j.right.table };
            out.insert(padded.clone());
        }
    }
    out
}
