//! Sort executor.

use crate::context::{OrderKey, SelectColumn};
use crate::executor::{Relation, RelationEntry};
use alloc::vec::Vec;
use core::cmp::Ordering;
use trellis_core::schema::Order;
use trellis_core::Value;

static NULL: Value = Value::Null;

/// Sort executor - orders entries, or whole groups, by a list of keys.
///
/// A single relation has its entries sorted. Several relations (the groups
/// of a GROUP BY) are sorted among themselves, comparing aggregated columns
/// by their computed value and plain columns by the group's first entry.
pub struct SortExecutor<'k> {
    keys: &'k [OrderKey],
}

impl<'k> SortExecutor<'k> {
    pub fn new(keys: &'k [OrderKey]) -> Self {
        Self { keys }
    }

    pub fn execute(&self, mut input: Vec<Relation>) -> Vec<Relation> {
        if input.len() == 1 {
            if let Some(relation) = input.first_mut() {
                relation
                    .entries
                    .sort_by(|a, b| self.compare(|k| entry_value(a, k), |k| entry_value(b, k)));
            }
        } else {
            input.sort_by(|a, b| self.compare(|k| group_value(a, k), |k| group_value(b, k)));
        }
        input
    }

    fn compare<'v>(
        &self,
        a: impl Fn(&SelectColumn) -> &'v Value,
        b: impl Fn(&SelectColumn) -> &'v Value,
    ) -> Ordering {
        for key in self.keys {
            let cmp = a(&key.column).cmp(b(&key.column));
            if cmp != Ordering::Equal {
                return match key.order {
                    Order::Asc => cmp,
                    Order::Desc => cmp.reverse(),
                };
            }
        }
        Ordering::Equal
    }
}

fn entry_value<'a>(entry: &'a RelationEntry, column: &SelectColumn) -> &'a Value {
    match column {
        SelectColumn::Column(c) => entry.get_field(c),
        SelectColumn::Aggregate(_) => &NULL,
    }
}

fn group_value<'a>(relation: &'a Relation, column: &SelectColumn) -> &'a Value {
    match column {
        SelectColumn::Column(c) => relation.entries.first().map_or(&NULL, |e| e.get_field(c)),
        SelectColumn::Aggregate(a) => relation.get_aggregation(&a.name()).unwrap_or(&NULL),
    }
}
