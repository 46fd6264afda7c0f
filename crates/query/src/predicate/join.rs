//! Join predicates.

use super::{next_predicate_id, ColumnRef, EvalType, PredicateId};
use crate::executor::join::{HashJoin, NestedLoopJoin};
use crate::executor::{Relation, RelationEntry};
use core::fmt;
use trellis_core::Value;

/// `left <op> right` over columns of two different tables.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinPredicate {
    id: PredicateId,
    pub left: ColumnRef,
    pub right: ColumnRef,
    pub op: EvalType,
    is_complement: bool,
}

impl JoinPredicate {
    pub fn new(left: ColumnRef, right: ColumnRef, op: EvalType) -> Self {
        Self {
            id: next_predicate_id(),
            left,
            right,
            op,
            is_complement: false,
        }
    }

    pub fn id(&self) -> PredicateId {
        self.id
    }

    pub fn is_complement(&self) -> bool {
        self.is_complement
    }

    pub fn set_complement(&mut self, is_complement: bool) {
        self.is_complement = is_complement;
    }

    /// The same condition with its sides swapped. Keeps the id.
    pub fn reverse(&self) -> Self {
        Self {
            id: self.id,
            left: self.right.clone(),
            right: self.left.clone(),
            op: self.op.reverse(),
            is_complement: self.is_complement,
        }
    }

    /// Whether a hash join can evaluate this predicate.
    pub fn is_equi_join(&self) -> bool {
        self.op == EvalType::Eq && !self.is_complement
    }

    pub(crate) fn eval_values(&self, left: &Value, right: &Value) -> bool {
        if left.is_null() || right.is_null() {
            return false;
        }
        self.op.compare(left, right) != self.is_complement
    }

    /// Evaluates the predicate on an entry that already holds both sides.
    pub fn eval_entry(&self, entry: &RelationEntry) -> bool {
        self.eval_values(entry.get_field(&self.left), entry.get_field(&self.right))
    }

    /// Joins two relations. With `outer`, every entry of `left` survives,
    /// padded with nulls when nothing in `right` matches.
    pub fn eval_relations(&self, left: &Relation, right: &Relation, outer: bool) -> Relation {
        let oriented = if left.tables().iter().any(|t| *t == self.left.table) {
            self.clone()
        } else {
            self.reverse()
        };
        if oriented.is_equi_join() {
            HashJoin::new(&oriented.left, &oriented.right, outer).execute(left, right)
        } else {
            NestedLoopJoin::new(&oriented, outer).execute(left, right)
        }
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complement {
            f.write_str("not ")?;
        }
        write!(
            f,
            "{} {} {}",
            self.left.normalized_name(),
            self.op,
            self.right.normalized_name()
        )
    }
}
