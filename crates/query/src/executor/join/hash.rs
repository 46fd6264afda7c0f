//! Hash Join implementation.

use crate::executor::{Relation, RelationEntry};
use crate::predicate::ColumnRef;
use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::Value;
use hashbrown::HashMap;

/// Hash Join executor for equi-joins.
///
/// Builds a hash table over the smaller input (over the right input for an
/// outer join, so that every left entry is looked up) and scans the other
/// input against it. Null keys never match.
pub struct HashJoin<'p> {
    left: &'p ColumnRef,
    right: &'p ColumnRef,
    is_outer_join: bool,
}

impl<'p> HashJoin<'p> {
    /// `left` must be read from the left input, `right` from the right one.
    pub fn new(left: &'p ColumnRef, right: &'p ColumnRef, is_outer_join: bool) -> Self {
        Self {
            left,
            right,
            is_outer_join,
        }
    }

    pub fn execute(&self, left: &Relation, right: &Relation) -> Relation {
        let build_left = !self.is_outer_join && left.len() <= right.len();
        let (build, scan, build_col, scan_col) = if build_left {
            (left, right, self.left, self.right)
        } else {
            (right, left, self.right, self.left)
        };

        let mut table: HashMap<&Value, Vec<&RelationEntry>> = HashMap::with_capacity(build.len());
        for entry in build.iter() {
            let key = entry.get_field(build_col);
            if !key.is_null() {
                table.entry(key).or_default().push(entry);
            }
        }

        let mut entries = Vec::with_capacity(scan.len());
        for entry in scan.iter() {
            let key = entry.get_field(scan_col);
            let matches = if key.is_null() { None } else { table.get(key) };
            match matches {
                Some(matches) => {
                    for m in matches {
                        let (l, r) = if build_left { (*m, entry) } else { (entry, *m) };
                        entries.push(RelationEntry::combine(l, left.tables(), r, right.tables()));
                    }
                }
                None if self.is_outer_join => {
                    entries.push(RelationEntry::combine_with_null(entry, left.tables()))
                }
                None => {}
            }
        }

        let tables: Vec<String> = left.tables().iter().chain(right.tables()).cloned().collect();
        Relation::new(entries, tables)
    }
}
