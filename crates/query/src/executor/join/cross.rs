//! Cross product.

use crate::executor::{Relation, RelationEntry};
use alloc::string::String;
use alloc::vec::Vec;

/// Pairs every left entry with every right entry, left-major.
pub struct CrossProduct;

impl CrossProduct {
    pub fn execute(left: &Relation, right: &Relation) -> Relation {
        let mut entries = Vec::with_capacity(left.len() * right.len());
        for l in left.iter() {
            for r in right.iter() {
                entries.push(RelationEntry::combine(l, left.tables(), r, right.tables()));
            }
        }
        let tables: Vec<String> = left.tables().iter().chain(right.tables()).cloned().collect();
        Relation::new(entries, tables)
    }
}
