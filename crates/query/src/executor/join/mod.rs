//! JOIN algorithm implementations.

mod cross;
mod hash;
mod nested;

pub use cross::CrossProduct;
pub use hash::HashJoin;
pub use nested::NestedLoopJoin;
