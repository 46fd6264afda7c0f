//! AND predicate pass - breaks down AND predicates into chained Select nodes.
//!
//! Example:
//! ```text
//! Select((a0 and (a1 and a2)) and (b or c))    =>    Select(a0)
//!        |                                                |
//!   TableAccess(t)                                    Select(a1)
//!                                                         |
//!                                                     Select(a2)
//!                                                         |
//!                                                   Select(b or c)
//!                                                         |
//!                                                   TableAccess(t)
//! ```
//!
//! OR nodes and join predicates cannot be split and stay whole. The split
//! predicates keep their ids.

use crate::context::QueryContext;
use crate::optimizer::OptimizerPass;
use crate::planner::{LogicalNode, LogicalPlan};
use crate::predicate::{Operator, Predicate};
use alloc::vec::Vec;

/// Pass that breaks down AND predicates into chained Select nodes.
pub struct AndPredicatePass;

impl OptimizerPass for AndPredicatePass {
    fn optimize(&self, mut plan: LogicalPlan, _query: &QueryContext) -> LogicalPlan {
        let selects = plan
            .tree
            .find(|n| matches!(n, LogicalNode::Select(Predicate::Combined(c)) if c.op == Operator::And));
        for id in selects {
            let LogicalNode::Select(predicate) = plan.tree.get(id) else {
                continue;
            };
            let mut conjuncts = Vec::new();
            break_and_predicate(predicate, &mut conjuncts);

            let mut chain = conjuncts
                .into_iter()
                .map(|p| plan.tree.add(LogicalNode::Select(p)))
                .collect::<Vec<_>>()
                .into_iter();
            let Some(first) = chain.next() else {
                continue;
            };
            let mut last = first;
            for next in chain {
                plan.tree.add_child(last, next);
                last = next;
            }
            plan.tree.replace_node_with_chain(id, first, last);
        }
        plan
    }

    fn name(&self) -> &'static str {
        "and_predicate"
    }
}

/// Flattens nested AND nodes, left to right.
///
/// A complemented node whose connective became AND after De Morgan is split
/// too: its children already carry the negation.
fn break_and_predicate(predicate: &Predicate, out: &mut Vec<Predicate>) {
    match predicate {
        Predicate::Combined(c) if c.op == Operator::And => {
            for child in &c.children {
                break_and_predicate(child, out);
            }
        }
        other => out.push(other.clone()),
    }
}
