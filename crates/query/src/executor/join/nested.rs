//! Nested Loop Join implementation.

use crate::executor::{Relation, RelationEntry};
use crate::predicate::JoinPredicate;
use alloc::string::String;
use alloc::vec::Vec;

/// Nested Loop Join executor.
///
/// Compares every pair of entries; used for every join condition a hash
/// table cannot answer.
pub struct NestedLoopJoin<'p> {
    predicate: &'p JoinPredicate,
    is_outer_join: bool,
}

impl<'p> NestedLoopJoin<'p> {
    /// The predicate's left column must belong to the left input.
    pub fn new(predicate: &'p JoinPredicate, is_outer_join: bool) -> Self {
        Self {
            predicate,
            is_outer_join,
        }
    }

    pub fn execute(&self, left: &Relation, right: &Relation) -> Relation {
        let mut entries = Vec::new();
        for l in left.iter() {
            let lv = l.get_field(&self.predicate.left);
            let mut matched = false;
            for r in right.iter() {
                if self.predicate.eval_values(lv, r.get_field(&self.predicate.right)) {
                    matched = true;
                    entries.push(RelationEntry::combine(l, left.tables(), r, right.tables()));
                }
            }
            if self.is_outer_join && !matched {
                entries.push(RelationEntry::combine_with_null(l, left.tables()));
            }
        }
        let tables: Vec<String> = left.tables().iter().chain(right.tables()).cloned().collect();
        Relation::new(entries, tables)
    }
}
