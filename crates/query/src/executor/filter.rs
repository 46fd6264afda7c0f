//! Filter executor.

use crate::executor::Relation;
use crate::predicate::Predicate;

/// Filter executor - keeps the entries a predicate accepts.
///
/// Join predicates evaluate against the two prefixed columns of each entry.
pub struct FilterExecutor<'p> {
    predicate: &'p Predicate,
}

impl<'p> FilterExecutor<'p> {
    pub fn new(predicate: &'p Predicate) -> Self {
        Self { predicate }
    }

    pub fn execute(&self, input: &Relation) -> Relation {
        self.predicate.eval(input)
    }
}
