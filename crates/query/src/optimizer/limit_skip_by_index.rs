//! Limit/Skip by index pass - lets an index scan apply LIMIT and SKIP itself.
//!
//! Example:
//! ```text
//! Limit                                Project
//!   |                                     |
//! Skip                         TableAccessByRowId(t)
//!   |                                     |
//! Project                  =>  IndexRangeScan(t.pkT, limit, skip)
//!   |
//! TableAccessByRowId(t)
//!   |
//! IndexRangeScan(t.pkT)
//! ```
//!
//! Folding only happens when nothing between the root and the scan can drop,
//! reorder or merge rows: aggregating projections, ordering, joins and
//! remaining filters all block it.

use crate::context::QueryContext;
use crate::optimizer::PhysicalPass;
use crate::planner::{NodeId, PhysicalNode, PhysicalPlan};
use alloc::vec::Vec;

pub struct LimitSkipByIndexPass;

impl LimitSkipByIndexPass {
    /// The index scan reachable from the root through row-preserving nodes.
    fn find_scan(plan: &PhysicalPlan, query: &QueryContext) -> Option<NodeId> {
        let select = query.as_select()?;
        if select.has_aggregates() || !select.order_by.is_empty() || !select.group_by.is_empty() {
            return None;
        }
        let mut current = plan.root()?;
        loop {
            match plan.tree.get(current) {
                PhysicalNode::IndexRangeScan { .. } => return Some(current),
                PhysicalNode::Limit | PhysicalNode::Skip | PhysicalNode::TableAccessByRowId(_) => {}
                PhysicalNode::Project { group_by, .. } if group_by.is_empty() => {}
                _ => return None,
            }
            current = plan.tree.child(current, 0)?;
        }
    }
}

impl PhysicalPass for LimitSkipByIndexPass {
    fn optimize(&self, mut plan: PhysicalPlan, query: &QueryContext) -> PhysicalPlan {
        if query.limit().is_none() && query.skip().is_none() {
            return plan;
        }
        let Some(scan) = Self::find_scan(&plan, query) else {
            return plan;
        };

        if let PhysicalNode::IndexRangeScan {
            use_limit, use_skip, ..
        } = plan.tree.get_mut(scan)
        {
            *use_limit = query.limit().is_some();
            *use_skip = query.skip().is_some();
        }
        let folded: Vec<NodeId> = plan
            .tree
            .find(|n| matches!(n, PhysicalNode::Limit | PhysicalNode::Skip));
        for id in folded {
            plan.tree.remove_node(id);
        }
        plan
    }

    fn name(&self) -> &'static str {
        "limit_skip_by_index"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AggregateFunc, AggregatedColumn, SelectContext};
    use crate::planner::{LogicalPlanGenerator, PhysicalPlanFactory, PlannerOptions};
    use crate::predicate::TableRef;
    use alloc::string::String;
    use alloc::vec;
    use trellis_core::schema::{Order, Schema, TableBuilder};
    use trellis_core::DataType;
    use trellis_storage::IndexStore;

    fn explain(query: &QueryContext) -> String {
        let t = TableBuilder::new("t")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap();
        let schema = Schema::new("db", 1, vec![t]).unwrap();
        let mut indices = IndexStore::new();
        indices.init(&schema);
        let mut generator = LogicalPlanGenerator::new(query);
        PhysicalPlanFactory::new(&schema, &indices, PlannerOptions::default())
            .create(generator.generate(), query)
            .explain()
    }

    #[test]
    fn test_skip_only() {
        let t = TableRef::new("t");
        let query: QueryContext = SelectContext::new()
            .from(t.clone())
            .filter(t.col("id").lte(10))
            .skip(3)
            .into();
        assert_eq!(
            explain(&query),
            "project()\n-table_access_by_row_id(t)\n--index_range_scan(t.pkT, skip)\n"
        );
    }

    #[test]
    fn test_order_by_blocks_folding() {
        let t = TableRef::new("t");
        let query: QueryContext = SelectContext::new()
            .from(t.clone())
            .filter(t.col("id").lte(10))
            .order_by(t.col("name"), Order::Asc)
            .limit(1)
            .into();
        assert_eq!(
            explain(&query),
            "limit\n\
             -project()\n\
             --order_by(t.name ASC)\n\
             ---table_access_by_row_id(t)\n\
             ----index_range_scan(t.pkT)\n"
        );
    }

    #[test]
    fn test_residual_filter_blocks_folding() {
        let t = TableRef::new("t");
        let query: QueryContext = SelectContext::new()
            .from(t.clone())
            .filter(t.col("id").lte(10))
            .filter(t.col("name").matches("x"))
            .column(AggregatedColumn::new(AggregateFunc::Count, t.col("id")))
            .limit(1)
            .into();
        let plan = explain(&query);
        assert!(plan.starts_with("limit\n"));
        assert!(!plan.contains("index_range_scan(t.pkT, limit)"));
    }
}
