//! Optimizer pass traits.

use crate::context::QueryContext;
use crate::planner::{LogicalPlan, PhysicalPlan};

/// An optimization pass that transforms a logical plan.
pub trait OptimizerPass {
    /// Optimizes the given logical plan of `query`.
    fn optimize(&self, plan: LogicalPlan, query: &QueryContext) -> LogicalPlan;

    /// Returns the name of this pass.
    fn name(&self) -> &'static str {
        "unnamed"
    }
}

/// An optimization pass over physical plans.
pub trait PhysicalPass {
    fn optimize(&self, plan: PhysicalPlan, query: &QueryContext) -> PhysicalPlan;

    fn name(&self) -> &'static str {
        "unnamed"
    }
}
