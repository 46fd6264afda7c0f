//! Grouping and aggregate executors.

use crate::context::{AggregateFunc, AggregatedColumn};
use crate::executor::{Relation, RelationEntry};
use crate::predicate::ColumnRef;
use alloc::vec::Vec;
use hashbrown::{HashMap, HashSet};
use libm::{exp, log, sqrt};
use trellis_core::Value;

/// Group by executor - partitions a relation by the values of some columns.
///
/// Groups come out in the order their first entry was seen. Null is a
/// grouping value like any other.
pub struct GroupByExecutor<'c> {
    columns: &'c [ColumnRef],
}

impl<'c> GroupByExecutor<'c> {
    pub fn new(columns: &'c [ColumnRef]) -> Self {
        Self { columns }
    }

    pub fn execute(&self, input: &Relation) -> Vec<Relation> {
        let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<Vec<RelationEntry>> = Vec::new();
        for entry in input.iter() {
            let key: Vec<Value> = self
                .columns
                .iter()
                .map(|c| entry.get_field(c).clone())
                .collect();
            let position = *positions.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[position].push(entry.clone());
        }
        groups
            .into_iter()
            .map(|entries| input.with_entries(entries))
            .collect()
    }
}

/// Aggregate executor - computes aggregated columns over each relation and
/// stores the results on it, keyed by `AggregatedColumn::name`.
///
/// Results already present on a relation are kept. `DISTINCT` yields several
/// values and is expanded by the projection instead.
pub struct AggregateExecutor<'c> {
    columns: &'c [AggregatedColumn],
}

impl<'c> AggregateExecutor<'c> {
    pub fn new(columns: &'c [AggregatedColumn]) -> Self {
        Self { columns }
    }

    pub fn execute(&self, mut input: Vec<Relation>) -> Vec<Relation> {
        for relation in &mut input {
            for column in self.columns {
                if column.func == AggregateFunc::Distinct {
                    continue;
                }
                let name = column.name();
                if relation.get_aggregation(&name).is_some() {
                    continue;
                }
                let value = aggregate(relation, column);
                relation.set_aggregation(name, value);
            }
        }
        input
    }
}

/// Values a column takes in `relation`, nulls dropped, optionally distinct.
fn input_values<'r>(relation: &'r Relation, column: &ColumnRef, distinct: bool) -> Vec<&'r Value> {
    let values = relation.iter().map(|e| e.get_field(column)).filter(|v| !v.is_null());
    if distinct {
        let mut seen = HashSet::new();
        values.filter(|v| seen.insert(*v)).collect()
    } else {
        values.collect()
    }
}

/// Distinct non-null values of `column`, in order of first appearance.
pub(crate) fn distinct_values(relation: &Relation, column: &ColumnRef) -> Vec<Value> {
    input_values(relation, column, true).into_iter().cloned().collect()
}

fn numbers(values: &[&Value]) -> Vec<f64> {
    values.iter().filter_map(|v| v.as_number()).collect()
}

fn aggregate(relation: &Relation, column: &AggregatedColumn) -> Value {
    let Some(target) = &column.target else {
        return Value::Int64(relation.len() as i64);
    };
    let values = input_values(relation, target, column.distinct_input);
    match column.func {
        AggregateFunc::Count | AggregateFunc::Distinct => Value::Int64(values.len() as i64),
        AggregateFunc::Sum => sum(&values),
        AggregateFunc::Avg => {
            let numbers = numbers(&values);
            if numbers.is_empty() {
                Value::Null
            } else {
                Value::Float64(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
        }
        AggregateFunc::Min => values.iter().min().map_or(Value::Null, |v| (*v).clone()),
        AggregateFunc::Max => values.iter().max().map_or(Value::Null, |v| (*v).clone()),
        AggregateFunc::StdDev => {
            let numbers = numbers(&values);
            if numbers.is_empty() {
                return Value::Null;
            }
            let n = numbers.len() as f64;
            let mean = numbers.iter().sum::<f64>() / n;
            let variance = numbers.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
            Value::Float64(sqrt(variance))
        }
        AggregateFunc::GeoMean => {
            let numbers = numbers(&values);
            if numbers.is_empty() {
                return Value::Null;
            }
            let log_sum: f64 = numbers.iter().map(|x| log(*x)).sum();
            Value::Float64(exp(log_sum / numbers.len() as f64))
        }
    }
}

/// Integer sum when every input is an integer, float sum otherwise.
fn sum(values: &[&Value]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }
    if values.iter().all(|v| matches!(v, Value::Int64(_))) {
        let total = values
            .iter()
            .filter_map(|v| v.as_i64())
            .fold(0i64, i64::wrapping_add);
        Value::Int64(total)
    } else {
        Value::Float64(numbers(values).iter().sum())
    }
}
