//! Project executor.

use super::aggregate::distinct_values;
use crate::context::{AggregateFunc, SelectColumn};
use crate::executor::{Relation, RelationEntry};
use crate::predicate::ColumnRef;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use trellis_core::{Payload, Row, Value};

/// Project executor - shapes result rows.
///
/// Without aggregates or grouping every entry is narrowed to the selected
/// columns; an empty column list keeps whole rows. Otherwise each input
/// relation (one per group) yields one row built from its aggregation
/// results, or one row per distinct value when a `DISTINCT` column is
/// selected.
pub struct ProjectExecutor<'c> {
    columns: &'c [SelectColumn],
    group_by: &'c [ColumnRef],
}

impl<'c> ProjectExecutor<'c> {
    pub fn new(columns: &'c [SelectColumn], group_by: &'c [ColumnRef]) -> Self {
        Self { columns, group_by }
    }

    fn is_aggregating(&self) -> bool {
        !self.group_by.is_empty() || self.columns.iter().any(|c| c.as_aggregate().is_some())
    }

    pub fn execute(&self, input: Vec<Relation>) -> Relation {
        let tables = input.first().map(|r| r.tables().to_vec()).unwrap_or_default();
        if self.is_aggregating() {
            let entries = input.iter().flat_map(|r| self.aggregated_rows(r)).collect();
            return Relation::new(entries, tables);
        }

        let mut merged = input.into_iter();
        let Some(mut relation) = merged.next() else {
            return Relation::new(Vec::new(), tables);
        };
        for rest in merged {
            relation.entries.extend(rest.entries);
        }
        if self.columns.is_empty() {
            return relation;
        }
        let prefixed = relation.is_prefix_applied();
        let entries = relation
            .iter()
            .map(|entry| {
                let payload: Payload = self
                    .columns
                    .iter()
                    .filter_map(|c| match c {
                        SelectColumn::Column(col) => {
                            Some((c.output_name(prefixed), entry.get_field(col).clone()))
                        }
                        SelectColumn::Aggregate(_) => None,
                    })
                    .collect();
                RelationEntry::from_row(Rc::new(Row::new(entry.id(), payload)))
            })
            .collect();
        Relation::new(entries, tables)
    }

    fn aggregated_rows(&self, relation: &Relation) -> Vec<RelationEntry> {
        let prefixed = relation.is_prefix_applied();
        let first = relation.entries.first();
        let mut payload = Payload::new();
        let mut distinct: Option<(usize, Vec<Value>)> = None;
        for (i, column) in self.columns.iter().enumerate() {
            let value = match column {
                SelectColumn::Column(c) => first.map_or(Value::Null, |e| e.get_field(c).clone()),
                SelectColumn::Aggregate(a) if a.func == AggregateFunc::Distinct => {
                    if let Some(target) = &a.target {
                        distinct = Some((i, distinct_values(relation, target)));
                    }
                    continue;
                }
                SelectColumn::Aggregate(a) => relation
                    .get_aggregation(&a.name())
                    .cloned()
                    .unwrap_or(Value::Null),
            };
            payload.insert(column.output_name(prefixed), value);
        }

        match distinct {
            None => vec![RelationEntry::from_row(Rc::new(Row::dummy(payload)))],
            Some((i, values)) => {
                let name = self.columns[i].output_name(prefixed);
                values
                    .into_iter()
                    .map(|value| {
                        let mut row = payload.clone();
                        row.insert(name.clone(), value);
                        RelationEntry::from_row(Rc::new(Row::dummy(row)))
                    })
                    .collect()
            }
        }
    }
}
