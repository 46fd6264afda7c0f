//! Cross product pass - converts multi-way cross products to binary ones.
//!
//! Example:
//! ```text
//! CrossProduct(A, B, C, D)    =>            CrossProduct
//!                                           /         \
//!                                    CrossProduct      D
//!                                     /        \
//!                              CrossProduct     C
//!                               /      \
//!                              A        B
//! ```
//!
//! Execution only handles binary cross products, and ImplicitJoinsPass can
//! only fuse a join predicate with a binary one.

use crate::context::QueryContext;
use crate::optimizer::OptimizerPass;
use crate::planner::{LogicalNode, LogicalPlan};
use alloc::vec::Vec;

/// Pass that turns an n-ary cross product into a left-deep binary tree.
pub struct CrossProductPass;

impl OptimizerPass for CrossProductPass {
    fn optimize(&self, mut plan: LogicalPlan, _query: &QueryContext) -> LogicalPlan {
        let wide = plan
            .tree
            .find(|n| matches!(n, LogicalNode::CrossProduct));
        for id in wide {
            let children: Vec<_> = plan.tree.children(id).to_vec();
            if children.len() <= 2 {
                continue;
            }
            for child in &children {
                plan.tree.detach(*child);
            }
            let (last, rest) = match children.split_last() {
                Some(split) => split,
                None => continue,
            };
            let mut left = rest[0];
            for right in &rest[1..] {
                let product = plan.tree.add(LogicalNode::CrossProduct);
                plan.tree.add_child(product, left);
                plan.tree.add_child(product, *right);
                left = product;
            }
            plan.tree.add_child(id, left);
            plan.tree.add_child(id, *last);
        }
        plan
    }

    fn name(&self) -> &'static str {
        "cross_product"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::tree::Tree;
    use crate::predicate::TableRef;

    #[test]
    fn test_four_way_product() {
        let mut tree = Tree::new();
        let root = tree.push(None, LogicalNode::CrossProduct);
        for name in ["a", "b", "c", "d"] {
            tree.push(Some(root), LogicalNode::TableAccess(TableRef::new(name)));
        }
        let query: QueryContext = crate::context::SelectContext::new().into();
        let plan = CrossProductPass.optimize(LogicalPlan { tree }, &query);
        assert_eq!(
            plan.explain(),
            "cross_product\n\
             -cross_product\n\
             --cross_product\n\
             ---table_access(a)\n\
             ---table_access(b)\n\
             --table_access(c)\n\
             -table_access(d)\n"
        );
    }
}
