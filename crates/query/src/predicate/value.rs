//! Predicates comparing a column against literal or bound values.

use super::{next_predicate_id, ColumnRef, PredicateId};
use alloc::format;
use alloc::vec::Vec;
use core::fmt;
use trellis_core::pattern_match;
use trellis_core::{Error, Result, Value};
use trellis_index::{KeyRange, SingleKeyRangeSet};

/// Comparison performed by a predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvalType {
    Between,
    Eq,
    Gte,
    Gt,
    In,
    Lte,
    Lt,
    Match,
    Neq,
}

impl EvalType {
    /// The operator with its operands swapped (`a < b` is `b > a`).
    pub fn reverse(self) -> Self {
        match self {
            EvalType::Gt => EvalType::Lt,
            EvalType::Gte => EvalType::Lte,
            EvalType::Lt => EvalType::Gt,
            EvalType::Lte => EvalType::Gte,
            other => other,
        }
    }

    /// Compares two non-null values.
    pub(crate) fn compare(self, a: &Value, b: &Value) -> bool {
        match self {
            EvalType::Eq => a == b,
            EvalType::Neq => a != b,
            EvalType::Gt => a > b,
            EvalType::Gte => a >= b,
            EvalType::Lt => a < b,
            EvalType::Lte => a <= b,
            EvalType::Match => match (a.as_str(), b.as_str()) {
                (Some(value), Some(pattern)) => pattern_match::regex(value, pattern),
                _ => false,
            },
            EvalType::Between | EvalType::In => false,
        }
    }

    fn name(self) -> &'static str {
        match self {
            EvalType::Between => "between",
            EvalType::Eq => "eq",
            EvalType::Gte => "gte",
            EvalType::Gt => "gt",
            EvalType::In => "in",
            EvalType::Lte => "lte",
            EvalType::Lt => "lt",
            EvalType::Match => "match",
            EvalType::Neq => "neq",
        }
    }
}

impl fmt::Display for EvalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A predicate operand: a literal, or a placeholder filled in by `bind`.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Value(Value),
    Param { index: usize, bound: Option<Value> },
}

impl Operand {
    pub fn param(index: usize) -> Self {
        Operand::Param { index, bound: None }
    }

    /// The current value; `None` for a parameter that has not been bound.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Param { bound, .. } => bound.as_ref(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.value().is_some()
    }

    /// Resolves a placeholder from `params`. Literals are left alone.
    pub fn bind(&mut self, params: &[Value]) -> Result<()> {
        if let Operand::Param { index, bound } = self {
            let value = params.get(*index).ok_or_else(|| {
                Error::invalid_query(format!("No value bound for parameter ?{}", index))
            })?;
            *bound = Some(value.clone());
        }
        Ok(())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{}", v),
            Operand::Param { index, bound: None } => write!(f, "?{}", index),
            Operand::Param { bound: Some(v), .. } => write!(f, "{}", v),
        }
    }
}

/// `column <op> operands`.
///
/// `Between` takes two operands, `In` any number, the rest exactly one. A
/// null operand turns `Eq`/`Neq` into null tests; otherwise rows whose column
/// is null never match, complemented or not.
#[derive(Clone, Debug, PartialEq)]
pub struct ValuePredicate {
    id: PredicateId,
    pub column: ColumnRef,
    pub op: EvalType,
    pub operands: Vec<Operand>,
    is_complement: bool,
}

impl ValuePredicate {
    pub fn new(column: ColumnRef, op: EvalType, operands: Vec<Operand>) -> Self {
        Self {
            id: next_predicate_id(),
            column,
            op,
            operands,
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

    fn operand(&self, i: usize) -> &Value {
        self.operands
            .get(i)
            .and_then(Operand::value)
            .unwrap_or(&Value::Null)
    }

    fn is_null_test(&self) -> bool {
        matches!(self.op, EvalType::Eq | EvalType::Neq) && self.operand(0).is_null()
    }

    /// Evaluates the predicate against one column value.
    pub fn eval_value(&self, value: &Value) -> bool {
        if self.is_null_test() {
            let is_null = value.is_null();
            let matched = if self.op == EvalType::Eq { is_null } else { !is_null };
            return matched != self.is_complement;
        }
        if value.is_null() {
            return false;
        }
        let matched = match self.op {
            EvalType::Between => {
                let (lo, hi) = (self.operand(0), self.operand(1));
                !lo.is_null() && !hi.is_null() && value >= lo && value <= hi
            }
            EvalType::In => self
                .operands
                .iter()
                .filter_map(Operand::value)
                .any(|v| v == value),
            op => {
                let operand = self.operand(0);
                !operand.is_null() && op.compare(value, operand)
            }
        };
        matched != self.is_complement
    }

    pub fn bind(&mut self, params: &[Value]) -> Result<()> {
        for operand in &mut self.operands {
            operand.bind(params)?;
        }
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.operands.iter().all(Operand::is_bound)
    }

    /// Whether an index over `column` can evaluate this predicate exactly.
    pub fn is_key_range_compatible(&self) -> bool {
        let operands_known = !self.operands.is_empty()
            && self
                .operands
                .iter()
                .all(|o| o.value().map_or(false, |v| !v.is_null()));
        operands_known
            && matches!(
                self.op,
                EvalType::Between
                    | EvalType::Eq
                    | EvalType::Gt
                    | EvalType::Gte
                    | EvalType::In
                    | EvalType::Lt
                    | EvalType::Lte
            )
    }

    /// The key ranges matching this predicate.
    ///
    /// Only meaningful when `is_key_range_compatible` holds.
    pub fn to_key_range_set(&self) -> SingleKeyRangeSet {
        let value = |i: usize| self.operand(i).clone();
        let set = match self.op {
            EvalType::Eq => SingleKeyRangeSet::from_ranges([KeyRange::only(value(0))]),
            EvalType::Gt => SingleKeyRangeSet::from_ranges([KeyRange::lower_bound(value(0), true)]),
            EvalType::Gte => {
                SingleKeyRangeSet::from_ranges([KeyRange::lower_bound(value(0), false)])
            }
            EvalType::Lt => SingleKeyRangeSet::from_ranges([KeyRange::upper_bound(value(0), true)]),
            EvalType::Lte => {
                SingleKeyRangeSet::from_ranges([KeyRange::upper_bound(value(0), false)])
            }
            EvalType::Between => SingleKeyRangeSet::from_ranges([KeyRange::new(
                Some(value(0)),
                Some(value(1)),
                false,
                false,
            )]),
            EvalType::In => SingleKeyRangeSet::from_ranges(
                self.operands
                    .iter()
                    .filter_map(Operand::value)
                    .map(|v| KeyRange::only(v.clone())),
            ),
            EvalType::Match | EvalType::Neq => SingleKeyRangeSet::from_ranges([KeyRange::all()]),
        };
        if self.is_complement {
            set.complement()
        } else {
            set
        }
    }
}

impl fmt::Display for ValuePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complement {
            f.write_str("not ")?;
        }
        write!(f, "{} {} ", self.column.normalized_name(), self.op)?;
        match self.operands.as_slice() {
            [single] => write!(f, "{}", single),
            many => {
                f.write_str("(")?;
                for (i, o) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", o)?;
                }
                f.write_str(")")
            }
        }
    }
}
