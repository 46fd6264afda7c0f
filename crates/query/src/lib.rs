//! Trellis Query - planning and execution for the Trellis query engine.
//!
//! - `predicate`: value, join and combined predicates over table columns
//! - `context`: SELECT/INSERT/UPDATE/DELETE query descriptions
//! - `planner`: logical plan generation and physical plan lowering
//! - `optimizer`: logical and physical rewrite passes
//! - `executor`: the steps a physical plan runs, over `Relation`s
//!
//! A query goes through `LogicalPlanGenerator`, then `PhysicalPlanFactory`,
//! and the resulting `PhysicalPlan` runs against an `ExecContext`.

#![no_std]

extern crate alloc;

pub mod context;
pub mod executor;
pub mod optimizer;
pub mod planner;
pub mod predicate;

pub use context::{
    AggregateFunc, AggregatedColumn, DeleteContext, InsertContext, OrderKey, QueryContext,
    SelectColumn, SelectContext, UpdateContext,
};
pub use executor::{ExecContext, Relation, RelationEntry};
pub use planner::{LogicalPlan, LogicalPlanGenerator, PhysicalPlan, PhysicalPlanFactory, PlannerOptions};
pub use predicate::{ColumnRef, EvalType, JoinPredicate, Predicate, TableRef};
