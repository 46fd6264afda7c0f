//! Query optimizer module.
//!
//! Logical passes restructure the operator tree; physical passes pick access
//! paths using index statistics.

mod and_predicate;
mod cross_product;
mod get_row_count;
mod implicit_joins;
mod index_range_scan;
mod limit_skip_by_index;
mod pass;
mod predicate_pushdown;

pub use and_predicate::AndPredicatePass;
pub use cross_product::CrossProductPass;
pub use get_row_count::GetRowCountPass;
pub use implicit_joins::ImplicitJoinsPass;
pub use index_range_scan::IndexRangeScanPass;
pub(crate) use index_range_scan::key_ranges;
pub use limit_skip_by_index::LimitSkipByIndexPass;
pub use pass::{OptimizerPass, PhysicalPass};
pub use predicate_pushdown::PushDownSelectionsPass;

use crate::context::QueryContext;
use crate::planner::LogicalPlan;
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Applies logical optimization passes in order.
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizerPass>>,
}

impl Optimizer {
    /// The passes for the kind of `query`:
    ///
    /// 1. AndPredicatePass - split conjunctions into chained Selects
    /// 2. CrossProductPass - binary cross products, three or more tables only
    /// 3. PushDownSelectionsPass - move Selects towards the table accesses
    /// 4. ImplicitJoinsPass - turn Select over CrossProduct into Join
    ///
    /// Updates and deletes only run the first; inserts run none.
    pub fn for_query(query: &QueryContext) -> Self {
        let mut passes: Vec<Box<dyn OptimizerPass>> = Vec::new();
        match query {
            QueryContext::Select(s) => {
                passes.push(Box::new(AndPredicatePass));
                if s.from.len() >= 3 {
                    passes.push(Box::new(CrossProductPass));
                }
                passes.push(Box::new(PushDownSelectionsPass));
                passes.push(Box::new(ImplicitJoinsPass));
            }
            QueryContext::Update(_) | QueryContext::Delete(_) => {
                passes.push(Box::new(AndPredicatePass));
            }
            QueryContext::Insert(_) => {}
        }
        Self { passes }
    }

    /// Creates an optimizer with custom passes.
    pub fn with_passes(passes: Vec<Box<dyn OptimizerPass>>) -> Self {
        Self { passes }
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn optimize(&self, mut plan: LogicalPlan, query: &QueryContext) -> LogicalPlan {
        for pass in &self.passes {
            plan = pass.optimize(plan, query);
        }
        plan
    }
}
