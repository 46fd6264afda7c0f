//! Limit and skip executor.

use crate::executor::Relation;

/// Limit executor - applies LIMIT and SKIP to a relation.
pub struct LimitExecutor {
    limit: Option<usize>,
    skip: usize,
}

impl LimitExecutor {
    pub fn new(limit: Option<usize>, skip: usize) -> Self {
        Self { limit, skip }
    }

    pub fn limit_only(limit: usize) -> Self {
        Self::new(Some(limit), 0)
    }

    pub fn skip_only(skip: usize) -> Self {
        Self::new(None, skip)
    }

    pub fn execute(&self, mut input: Relation) -> Relation {
        let len = input.entries.len();
        let start = self.skip.min(len);
        let end = match self.limit {
            Some(limit) => start.saturating_add(limit).min(len),
            None => len,
        };
        input.entries.truncate(end);
        if start > 0 {
            input.entries.drain(..start);
        }
        input
    }
}
