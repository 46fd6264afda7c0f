//! AND / OR over child predicates.

use super::{next_predicate_id, Predicate, PredicateId};
use alloc::vec::Vec;
use core::fmt;

/// Logical connective of a combined predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    fn flip(self) -> Self {
        match self {
            Operator::And => Operator::Or,
            Operator::Or => Operator::And,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => f.write_str("and"),
            Operator::Or => f.write_str("or"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CombinedPredicate {
    id: PredicateId,
    pub op: Operator,
    pub children: Vec<Predicate>,
    is_complement: bool,
}

impl CombinedPredicate {
    pub fn new(op: Operator, children: Vec<Predicate>) -> Self {
        Self {
            id: next_predicate_id(),
            op,
            children,
            is_complement: false,
        }
    }

    pub fn id(&self) -> PredicateId {
        self.id
    }

    pub fn is_complement(&self) -> bool {
        self.is_complement
    }

    /// Applies De Morgan: the connective flips and every child is negated.
    ///
    /// Setting the flag to its current value is a no-op, so `true` twice is
    /// still a single negation and `false` afterwards restores the tree.
    pub fn set_complement(&mut self, is_complement: bool) {
        if self.is_complement == is_complement {
            return;
        }
        self.is_complement = is_complement;
        self.op = self.op.flip();
        for child in &mut self.children {
            let negated = !child.is_complement();
            child.set_complement(negated);
        }
    }
}

impl fmt::Display for CombinedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.op)?;
            }
            write!(f, "{}", child)?;
        }
        f.write_str(")")
    }
}
