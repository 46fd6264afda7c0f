//! Get row count pass - answers a bare `COUNT(*)` from index statistics.
//!
//! Example:
//! ```text
//! Project(COUNT(*))                 Project(COUNT(*))
//!        |                                 |
//! Aggregation(COUNT(*))     =>      GetRowCount(t)
//!        |
//! TableAccessFull(t)
//! ```
//!
//! Only applies to single-table queries without WHERE, LIMIT, SKIP or
//! GROUP BY whose sole aggregate is `COUNT(*)`.

use crate::context::QueryContext;
use crate::optimizer::PhysicalPass;
use crate::planner::{PhysicalNode, PhysicalPlan};

pub struct GetRowCountPass;

impl GetRowCountPass {
    fn applies(query: &QueryContext) -> bool {
        let Some(select) = query.as_select() else {
            return false;
        };
        let mut aggregates = select.aggregates();
        let only_count_star = matches!(
            (aggregates.next(), aggregates.next()),
            (Some(a), None) if a.is_count_star()
        );
        only_count_star
            && select.from.len() == 1
            && select.where_clause.is_none()
            && select.limit.is_none()
            && select.skip.is_none()
            && select.group_by.is_empty()
    }
}

impl PhysicalPass for GetRowCountPass {
    fn optimize(&self, mut plan: PhysicalPlan, query: &QueryContext) -> PhysicalPlan {
        if !Self::applies(query) {
            return plan;
        }
        let Some(aggregation) = plan
            .tree
            .find(|n| matches!(n, PhysicalNode::Aggregation(_)))
            .first()
            .copied()
        else {
            return plan;
        };
        let Some(scan) = plan.tree.child(aggregation, 0) else {
            return plan;
        };
        let PhysicalNode::TableAccessFull(table) = plan.tree.get(scan).clone() else {
            return plan;
        };
        let count = plan.tree.add(PhysicalNode::GetRowCount(table));
        plan.tree.replace_chain_with_node(aggregation, scan, count);
        plan
    }

    fn name(&self) -> &'static str {
        "get_row_count"
    }
}
