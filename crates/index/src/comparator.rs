//! Key ordering for indices.
//!
//! An index stores its keys in *tree order*: lexicographic over the key's
//! columns, each column ascending or descending as declared. Range checks on
//! the other hand work in value space, so a `KeyRange` means the same thing
//! whatever the column's order.

use crate::key::Key;
use crate::key_range::{cmp_lower, cmp_upper, IndexRange, KeyRange};
use alloc::vec::Vec;
use core::cmp::Ordering;
use trellis_core::schema::Order;
use trellis_core::Value;

/// Compares keys for one index.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyComparator {
    orders: Vec<Order>,
}

impl KeyComparator {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Single ascending column.
    pub fn asc() -> Self {
        Self::new(alloc::vec![Order::Asc])
    }

    /// Single descending column.
    pub fn desc() -> Self {
        Self::new(alloc::vec![Order::Desc])
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    fn order(&self, column: usize) -> Order {
        self.orders.get(column).copied().unwrap_or_default()
    }

    /// Compares two keys in tree order.
    pub fn compare(&self, a: &Key, b: &Key) -> Ordering {
        let (a, b) = (a.values(), b.values());
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            let ord = apply(self.order(i), x.cmp(y));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.len().cmp(&b.len())
    }

    #[inline]
    pub fn is_less(&self, a: &Key, b: &Key) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Whether every column of `key` lies inside its column range.
    pub fn is_in_range(&self, key: &Key, range: &IndexRange) -> bool {
        key.values()
            .iter()
            .zip(range.columns())
            .all(|(v, r)| r.contains(v))
    }

    /// Whether `key` sorts before every key the range can contain.
    ///
    /// Only the leading column is considered, which keeps the predicate
    /// monotone in tree order.
    pub fn before_range(&self, key: &Key, range: &IndexRange) -> bool {
        let (Some(v), Some(r)) = (key.values().first(), range.columns().first()) else {
            return false;
        };
        match self.order(0) {
            Order::Asc => below(v, r),
            Order::Desc => above(v, r),
        }
    }

    /// Whether `key` sorts after every key the range can contain.
    pub fn past_range(&self, key: &Key, range: &IndexRange) -> bool {
        let (Some(v), Some(r)) = (key.values().first(), range.columns().first()) else {
            return false;
        };
        match self.order(0) {
            Order::Asc => above(v, r),
            Order::Desc => below(v, r),
        }
    }

    /// Sorts ranges by where they start in tree order.
    pub fn sort_ranges(&self, ranges: &mut [IndexRange]) {
        let order = self.order(0);
        ranges.sort_by(|a, b| match (a.columns().first(), b.columns().first()) {
            (Some(x), Some(y)) => match order {
                Order::Asc => cmp_lower(x, y),
                Order::Desc => cmp_upper(y, x),
            },
            _ => Ordering::Equal,
        });
    }
}

impl Default for KeyComparator {
    fn default() -> Self {
        Self::asc()
    }
}

#[inline]
fn apply(order: Order, ord: Ordering) -> Ordering {
    match order {
        Order::Asc => ord,
        Order::Desc => ord.reverse(),
    }
}

/// `v` lies below the range's lower bound.
fn below(v: &Value, r: &KeyRange) -> bool {
    match &r.from {
        None => false,
        Some(from) => match v.cmp(from) {
            Ordering::Less => true,
            Ordering::Equal => r.exclude_lower,
            Ordering::Greater => false,
        },
    }
}

/// `v` lies above the range's upper bound.
fn above(v: &Value, r: &KeyRange) -> bool {
    match &r.to {
        None => false,
        Some(to) => match v.cmp(to) {
            Ordering::Greater => true,
            Ordering::Equal => r.exclude_upper,
            Ordering::Less => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_compare_desc() {
        let c = KeyComparator::desc();
        assert_eq!(c.compare(&Key::from(1i64), &Key::from(2i64)), Ordering::Greater);
        assert!(c.is_less(&Key::from("b"), &Key::from("a")));
    }

    #[test]
    fn test_compare_composite_mixed_order() {
        let c = KeyComparator::new(vec![Order::Asc, Order::Desc]);
        let a = Key::from(vec![Value::Int64(1), Value::Int64(9)]);
        let b = Key::from(vec![Value::Int64(1), Value::Int64(3)]);
        let d = Key::from(vec![Value::Int64(2), Value::Int64(0)]);
        assert!(c.is_less(&a, &b));
        assert!(c.is_less(&b, &d));
    }

    #[test]
    fn test_range_position_follows_order() {
        let range = IndexRange::Single(KeyRange::new(
            Some(Value::Int64(10)),
            Some(Value::Int64(20)),
            false,
            false,
        ));
        let asc = KeyComparator::asc();
        let desc = KeyComparator::desc();
        assert!(asc.before_range(&Key::from(5i64), &range));
        assert!(asc.past_range(&Key::from(25i64), &range));
        assert!(desc.before_range(&Key::from(25i64), &range));
        assert!(desc.past_range(&Key::from(5i64), &range));
        assert!(asc.is_in_range(&Key::from(15i64), &range));
    }

    #[test]
    fn test_sort_ranges_desc() {
        let mut ranges = vec![
            IndexRange::Single(KeyRange::only(Value::Int64(1))),
            IndexRange::Single(KeyRange::only(Value::Int64(7))),
        ];
        KeyComparator::desc().sort_ranges(&mut ranges);
        assert_eq!(ranges[0], IndexRange::Single(KeyRange::only(Value::Int64(7))));
    }
}
