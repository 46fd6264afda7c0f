//! B+Tree index.
//!
//! Nodes live in an arena and refer to each other by `NodeId`; leaves are
//! chained both ways so range scans can walk forward or backward.

mod node;
mod tree;

pub use node::{Node, NodeId};
pub use tree::{BTreeIndex, DEFAULT_ORDER};
