//! Trellis Index - Index implementations for the Trellis query engine.
//!
//! - `BTreeIndex`: B+Tree over `Key`s, unique or multi-entry, ASC/DESC per column
//! - `RowIdIndex`: the implicit per-table row-id index
//! - `NullableIndex`: keeps null keys beside a wrapped index
//! - `KeyRange` / `SingleKeyRangeSet` / `IndexRange`: scan bounds
//!
//! # Example
//!
//! ```rust
//! use trellis_index::{BTreeIndex, Index, IndexRange, Key, KeyComparator, KeyRange};
//! use trellis_core::Value;
//!
//! let mut btree = BTreeIndex::new("users.idxAge", false, KeyComparator::asc());
//! btree.add(Key::from(10i64), 100).unwrap();
//! btree.add(Key::from(20i64), 200).unwrap();
//! btree.add(Key::from(5i64), 50).unwrap();
//!
//! assert_eq!(btree.get(&Key::from(10i64)), vec![100]);
//!
//! let range = IndexRange::Single(KeyRange::lower_bound(Value::Int64(10), false));
//! assert_eq!(btree.get_range(&[range.clone()], false, None, 0), vec![100, 200]);
//! assert_eq!(btree.cost(Some(&range)), 2);
//! ```

#![no_std]

extern crate alloc;

pub mod btree;
pub mod comparator;
mod key;
pub mod key_range;
pub mod nullable;
pub mod row_id;
pub mod stats;
pub mod traits;

pub use btree::BTreeIndex;
pub use comparator::KeyComparator;
pub use key::Key;
pub use key_range::{IndexRange, KeyRange, SingleKeyRangeSet};
pub use nullable::NullableIndex;
pub use row_id::RowIdIndex;
pub use stats::IndexStats;
pub use traits::{Index, IndexError};
