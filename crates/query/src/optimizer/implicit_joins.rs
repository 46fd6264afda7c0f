//! Implicit joins pass - converts Select + CrossProduct patterns to Join nodes.
//!
//! Example:
//! ```text
//! Select(a.id = b.a_id)       =>       Join(a.id = b.a_id)
//!        |                              /            \
//!   CrossProduct               TableAccess(a)   TableAccess(b)
//!    /        \
//! TableAccess(a) TableAccess(b)
//! ```
//!
//! The join is outer when its predicate was registered as an outer join
//! condition by the query.

use crate::context::QueryContext;
use crate::optimizer::OptimizerPass;
use crate::planner::{LogicalNode, LogicalPlan};
use crate::predicate::Predicate;

/// Pass that converts CrossProduct + Select patterns to Join nodes.
pub struct ImplicitJoinsPass;

impl OptimizerPass for ImplicitJoinsPass {
    fn optimize(&self, mut plan: LogicalPlan, query: &QueryContext) -> LogicalPlan {
        let outer_ids = query.as_select().map(|s| &s.outer_join_predicates);
        let candidates = plan
            .tree
            .find(|n| matches!(n, LogicalNode::Select(Predicate::Join(_))));
        for id in candidates {
            let Some(child) = plan.tree.child(id, 0) else {
                continue;
            };
            let is_binary_product = matches!(plan.tree.get(child), LogicalNode::CrossProduct)
                && plan.tree.children(child).len() == 2;
            if !is_binary_product {
                continue;
            }
            let LogicalNode::Select(Predicate::Join(predicate)) = plan.tree.get(id) else {
                continue;
            };
            let predicate = predicate.clone();
            let outer = outer_ids.map_or(false, |ids| ids.contains(&predicate.id()));
            let join = plan.tree.add(LogicalNode::Join { predicate, outer });
            plan.tree.replace_chain_with_node(id, child, join);
        }
        plan
    }

    fn name(&self) -> &'static str {
        "implicit_joins"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SelectContext;
    use crate::planner::LogicalPlanGenerator;
    use crate::predicate::TableRef;

    #[test]
    fn test_select_over_product_becomes_join() {
        let (a, b) = (TableRef::new("a"), TableRef::new("b").alias("bb"));
        let query: QueryContext = SelectContext::new()
            .from(a.clone())
            .inner_join(b.clone(), a.col("id").join_eq(&b.col("a_id")))
            .into();
        let mut generator = LogicalPlanGenerator::new(&query);
        assert_eq!(
            generator.generate().explain(),
            "project()\n\
             -join(type: inner, a.id eq bb.a_id)\n\
             --table_access(a)\n\
             --table_access(b as bb)\n"
        );
    }

    #[test]
    fn test_value_select_is_left_alone() {
        let (a, b) = (TableRef::new("a"), TableRef::new("b"));
        let query: QueryContext = SelectContext::new()
            .from(a.clone())
            .from(b.clone())
            .filter(a.col("x").lt(5))
            .into();
        let mut generator = LogicalPlanGenerator::new(&query);
        let plan = generator.generate();
        assert!(plan.tree.find(|n| matches!(n, LogicalNode::Join { .. })).is_empty());
        assert_eq!(plan.tree.find(|n| matches!(n, LogicalNode::CrossProduct)).len(), 1);
    }
}
