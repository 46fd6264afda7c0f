//! Predicate model.
//!
//! A predicate is a tree of value comparisons, join conditions and AND/OR
//! nodes. Every node carries a stable id; clones keep it, so a plan compiled
//! from one copy of a query can look predicates up in another after the
//! parameters were bound.

mod column;
mod combined;
mod join;
mod value;

pub use column::{ColumnRef, TableRef};
pub use combined::{CombinedPredicate, Operator};
pub use join::JoinPredicate;
pub use value::{EvalType, Operand, ValuePredicate};

use crate::executor::{Relation, RelationEntry};
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use trellis_core::{Result, Value};
use trellis_index::SingleKeyRangeSet;

pub type PredicateId = u64;

static NEXT_PREDICATE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_predicate_id() -> PredicateId {
    NEXT_PREDICATE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Value(ValuePredicate),
    Join(JoinPredicate),
    Combined(CombinedPredicate),
}

impl Predicate {
    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::Combined(CombinedPredicate::new(Operator::And, children))
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Combined(CombinedPredicate::new(Operator::Or, children))
    }

    /// The logical negation of `predicate`.
    pub fn not(mut predicate: Predicate) -> Self {
        let negated = !predicate.is_complement();
        predicate.set_complement(negated);
        predicate
    }

    pub fn id(&self) -> PredicateId {
        match self {
            Predicate::Value(p) => p.id(),
            Predicate::Join(p) => p.id(),
            Predicate::Combined(p) => p.id(),
        }
    }

    pub fn is_complement(&self) -> bool {
        match self {
            Predicate::Value(p) => p.is_complement(),
            Predicate::Join(p) => p.is_complement(),
            Predicate::Combined(p) => p.is_complement(),
        }
    }

    pub fn set_complement(&mut self, is_complement: bool) {
        match self {
            Predicate::Value(p) => p.set_complement(is_complement),
            Predicate::Join(p) => p.set_complement(is_complement),
            Predicate::Combined(p) => p.set_complement(is_complement),
        }
    }

    pub fn as_join(&self) -> Option<&JoinPredicate> {
        match self {
            Predicate::Join(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&ValuePredicate> {
        match self {
            Predicate::Value(p) => Some(p),
            _ => None,
        }
    }

    pub fn eval_entry(&self, entry: &RelationEntry) -> bool {
        match self {
            Predicate::Value(p) => p.eval_value(entry.get_field(&p.column)),
            Predicate::Join(p) => p.eval_entry(entry),
            Predicate::Combined(p) => match p.op {
                Operator::And => p.children.iter().all(|c| c.eval_entry(entry)),
                Operator::Or => p.children.iter().any(|c| c.eval_entry(entry)),
            },
        }
    }

    /// Keeps the entries of `relation` satisfying the predicate.
    pub fn eval(&self, relation: &Relation) -> Relation {
        let entries = relation
            .iter()
            .filter(|e| self.eval_entry(e))
            .cloned()
            .collect();
        relation.with_entries(entries)
    }

    /// Columns referenced anywhere in the tree, in order of appearance.
    pub fn columns(&self) -> Vec<ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<ColumnRef>) {
        match self {
            Predicate::Value(p) => out.push(p.column.clone()),
            Predicate::Join(p) => {
                out.push(p.left.clone());
                out.push(p.right.clone());
            }
            Predicate::Combined(p) => {
                for child in &p.children {
                    child.collect_columns(out);
                }
            }
        }
    }

    /// Effective names of the tables the predicate reads.
    pub fn tables(&self) -> BTreeSet<String> {
        self.columns().into_iter().map(|c| c.table).collect()
    }

    pub fn find(&self, id: PredicateId) -> Option<&Predicate> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Predicate::Combined(p) => p.children.iter().find_map(|c| c.find(id)),
            _ => None,
        }
    }

    pub fn find_mut(&mut self, id: PredicateId) -> Option<&mut Predicate> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Predicate::Combined(p) => p.children.iter_mut().find_map(|c| c.find_mut(id)),
            _ => None,
        }
    }

    /// Fills every parameter placeholder from `params`.
    pub fn bind(&mut self, params: &[Value]) -> Result<()> {
        match self {
            Predicate::Value(p) => p.bind(params),
            Predicate::Join(_) => Ok(()),
            Predicate::Combined(p) => {
                for child in &mut p.children {
                    child.bind(params)?;
                }
                Ok(())
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        match self {
            Predicate::Value(p) => p.is_bound(),
            Predicate::Join(_) => true,
            Predicate::Combined(p) => p.children.iter().all(Predicate::is_bound),
        }
    }

    /// Whether an index scan can replace evaluating this predicate.
    ///
    /// Holds for range-like value predicates, and for an OR whose children
    /// are all such predicates on one column.
    pub fn is_key_range_compatible(&self) -> bool {
        match self {
            Predicate::Value(p) => p.is_key_range_compatible(),
            Predicate::Join(_) => false,
            Predicate::Combined(p) => {
                if p.op != Operator::Or {
                    return false;
                }
                let mut column: Option<&ColumnRef> = None;
                p.children.iter().all(|child| match child {
                    Predicate::Value(v) if v.is_key_range_compatible() => match column {
                        Some(c) => c.same_column(&v.column),
                        None => {
                            column = Some(&v.column);
                            true
                        }
                    },
                    _ => false,
                })
            }
        }
    }

    /// Column an index scan for this predicate would key on.
    pub fn key_range_column(&self) -> Option<&ColumnRef> {
        match self {
            Predicate::Value(p) => Some(&p.column),
            Predicate::Combined(p) if self.is_key_range_compatible() => {
                p.children.first().and_then(Predicate::as_value).map(|v| &v.column)
            }
            _ => None,
        }
    }

    /// Key ranges matching the predicate; the full range when not
    /// `is_key_range_compatible`.
    pub fn to_key_range_set(&self) -> SingleKeyRangeSet {
        match self {
            Predicate::Value(p) => p.to_key_range_set(),
            Predicate::Combined(p) if self.is_key_range_compatible() => {
                let mut set = SingleKeyRangeSet::new();
                for child in &p.children {
                    if let Predicate::Value(v) = child {
                        for range in v.to_key_range_set().into_values() {
                            set.add(range);
                        }
                    }
                }
                set
            }
            _ => SingleKeyRangeSet::from_ranges([trellis_index::KeyRange::all()]),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Value(p) => write!(f, "{}", p),
            Predicate::Join(p) => write!(f, "{}", p),
            Predicate::Combined(p) => write!(f, "{}", p),
        }
    }
}

impl From<ValuePredicate> for Predicate {
    fn from(p: ValuePredicate) -> Self {
        Predicate::Value(p)
    }
}

impl From<JoinPredicate> for Predicate {
    fn from(p: JoinPredicate) -> Self {
        Predicate::Join(p)
    }
}

impl From<CombinedPredicate> for Predicate {
    fn from(p: CombinedPredicate) -> Self {
        Predicate::Combined(p)
    }
}

/// Predicate constructors, e.g. `t.col("age").gte(18)`.
impl ColumnRef {
    fn compare(&self, op: EvalType, value: Value) -> Predicate {
        ValuePredicate::new(self.clone(), op, vec![Operand::Value(value)]).into()
    }

    pub fn equals(&self, value: impl Into<Value>) -> Predicate {
        self.compare(EvalType::Eq, value.into())
    }

    pub fn not_equals(&self, value: impl Into<Value>) -> Predicate {
        self.compare(EvalType::Neq, value.into())
    }

    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(EvalType::Lt, value.into())
    }

    pub fn lte(&self, value: impl Into<Value>) -> Predicate {
        self.compare(EvalType::Lte, value.into())
    }

    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(EvalType::Gt, value.into())
    }

    pub fn gte(&self, value: impl Into<Value>) -> Predicate {
        self.compare(EvalType::Gte, value.into())
    }

    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        let operands = vec![Operand::Value(low.into()), Operand::Value(high.into())];
        ValuePredicate::new(self.clone(), EvalType::Between, operands).into()
    }

    pub fn in_list<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Predicate {
        let operands = values
            .into_iter()
            .map(|v| Operand::Value(v.into()))
            .collect();
        ValuePredicate::new(self.clone(), EvalType::In, operands).into()
    }

    /// Regex match against a string column.
    pub fn matches(&self, pattern: &str) -> Predicate {
        self.compare(EvalType::Match, Value::from(pattern))
    }

    pub fn is_null(&self) -> Predicate {
        self.compare(EvalType::Eq, Value::Null)
    }

    pub fn is_not_null(&self) -> Predicate {
        self.compare(EvalType::Neq, Value::Null)
    }

    /// `self <op> ?index`, bound later through `QueryContext::bind`.
    pub fn param(&self, op: EvalType, index: usize) -> Predicate {
        ValuePredicate::new(self.clone(), op, vec![Operand::param(index)]).into()
    }

    pub fn eq_param(&self, index: usize) -> Predicate {
        self.param(EvalType::Eq, index)
    }

    /// Join condition `self <op> other`.
    pub fn join(&self, op: EvalType, other: &ColumnRef) -> Predicate {
        JoinPredicate::new(self.clone(), other.clone(), op).into()
    }

    pub fn join_eq(&self, other: &ColumnRef) -> Predicate {
        self.join(EvalType::Eq, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use trellis_core::Row;

    fn people() -> Relation {
        let rows = [(1, "ann", 31i64), (2, "bo", 17), (3, "cy", 45)]
            .into_iter()
            .map(|(id, name, age)| Rc::new(Row::builder(id).set("name", name).set("age", age).build()))
            .collect();
        Relation::from_rows(rows, "p")
    }

    #[test]
    fn test_eval_filters_relation() {
        let p = TableRef::new("p");
        let adults = p.col("age").gte(18);
        assert_eq!(adults.eval(&people()).row_ids(), vec![1, 3]);

        let either = Predicate::or(vec![p.col("name").equals("bo"), p.col("age").gt(40)]);
        assert_eq!(either.eval(&people()).row_ids(), vec![2, 3]);
    }

    #[test]
    fn test_complement_applies_de_morgan() {
        let p = TableRef::new("p");
        let original = Predicate::and(vec![p.col("age").gte(18), p.col("name").not_equals("cy")]);
        let mut negated = original.clone();
        negated.set_complement(true);

        let Predicate::Combined(c) = &negated else {
            panic!("expected combined predicate");
        };
        assert_eq!(c.op, Operator::Or);
        assert!(c.children.iter().all(Predicate::is_complement));
        assert_eq!(negated.eval(&people()).row_ids(), vec![2, 3]);

        // Idempotent toggle, then back to the original tree.
        negated.set_complement(true);
        assert_eq!(negated.eval(&people()).row_ids(), vec![2, 3]);
        negated.set_complement(false);
        assert_eq!(negated, original);
    }

    #[test]
    fn test_clone_keeps_ids_and_find() {
        let p = TableRef::new("p");
        let inner = p.col("age").eq_param(0);
        let inner_id = inner.id();
        let tree = Predicate::and(vec![p.col("name").equals("ann"), inner]);
        let copy = tree.clone();
        assert_eq!(copy.id(), tree.id());
        assert!(copy.find(inner_id).is_some());
        assert!(copy.find(9_999_999).is_none());
    }

    #[test]
    fn test_bind_parameters() {
        let p = TableRef::new("p");
        let mut tree = Predicate::and(vec![p.col("age").param(EvalType::Gt, 0), p.col("name").eq_param(1)]);
        assert!(!tree.is_bound());
        assert!(tree.bind(&[Value::Int64(20)]).is_err());
        tree.bind(&[Value::Int64(20), Value::from("cy")]).unwrap();
        assert!(tree.is_bound());
        assert_eq!(tree.eval(&people()).row_ids(), vec![3]);
        assert_eq!(tree.to_string(), "(p.age gt 20 and p.name eq cy)");
    }

    #[test]
    fn test_key_range_compatibility() {
        let p = TableRef::new("p");
        assert!(p.col("age").between(1, 5).is_key_range_compatible());
        assert!(!p.col("name").matches("^a").is_key_range_compatible());
        assert!(!p.col("age").eq_param(0).is_key_range_compatible());

        let same_column = Predicate::or(vec![p.col("age").lt(10), p.col("age").gt(40)]);
        assert!(same_column.is_key_range_compatible());
        let set = same_column.to_key_range_set();
        assert_eq!(set.values().len(), 2);
        assert!(set.contains(&Value::Int64(45)));
        assert!(!set.contains(&Value::Int64(20)));

        let mixed = Predicate::or(vec![p.col("age").lt(10), p.col("name").equals("x")]);
        assert!(!mixed.is_key_range_compatible());
        let both = Predicate::and(vec![p.col("age").lt(10), p.col("age").gt(1)]);
        assert!(!both.is_key_range_compatible());
    }

    #[test]
    fn test_tables_and_columns() {
        let a = TableRef::new("a");
        let b = TableRef::new("b").alias("bb");
        let tree = Predicate::and(vec![a.col("x").join_eq(&b.col("y")), b.col("z").is_null()]);
        assert_eq!(tree.columns().len(), 3);
        let tables: Vec<String> = tree.tables().into_iter().collect();
        assert_eq!(tables, vec![String::from("a"), String::from("bb")]);
    }
}
