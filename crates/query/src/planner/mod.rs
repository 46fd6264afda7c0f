//! Query planner module.
//!
//! `LogicalPlanGenerator` turns a query context into an optimized logical
//! tree; `PhysicalPlanFactory` lowers that tree into executable steps.

mod logical;
mod physical;
pub mod tree;

pub use logical::{LogicalNode, LogicalPlan, LogicalPlanGenerator};
pub use physical::{Arity, PhysicalNode, PhysicalPlan, PhysicalPlanFactory, PlannerOptions};
pub use tree::{NodeId, Tree};
