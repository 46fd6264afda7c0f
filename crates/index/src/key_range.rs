//! Key ranges used to bound index scans.
//!
//! A `KeyRange` is an interval over single values, `None` meaning unbound on
//! that side. `SingleKeyRangeSet` keeps a union of ranges sorted and
//! non-overlapping, merging ranges that overlap or touch. `IndexRange` is what
//! an index scan receives: one `KeyRange` per indexed column.

use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use trellis_core::Value;

/// An interval of values.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyRange {
    pub from: Option<Value>,
    pub to: Option<Value>,
    pub exclude_lower: bool,
    pub exclude_upper: bool,
}

impl KeyRange {
    /// Creates a range; exclusion flags on unbound sides are dropped.
    pub fn new(
        from: Option<Value>,
        to: Option<Value>,
        exclude_lower: bool,
        exclude_upper: bool,
    ) -> Self {
        Self {
            exclude_lower: exclude_lower && from.is_some(),
            exclude_upper: exclude_upper && to.is_some(),
            from,
            to,
        }
    }

    /// The range containing every non-null value.
    pub fn all() -> Self {
        Self::new(None, None, false, false)
    }

    /// The range containing exactly `value`.
    pub fn only(value: Value) -> Self {
        Self::new(Some(value.clone()), Some(value), false, false)
    }

    /// Values greater than (or equal to) `value`.
    pub fn lower_bound(value: Value, exclusive: bool) -> Self {
        Self::new(Some(value), None, exclusive, false)
    }

    /// Values less than (or equal to) `value`.
    pub fn upper_bound(value: Value, exclusive: bool) -> Self {
        Self::new(None, Some(value), false, exclusive)
    }

    pub fn is_all(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn is_only(&self) -> bool {
        match (&self.from, &self.to) {
            (Some(a), Some(b)) => a == b && !self.exclude_lower && !self.exclude_upper,
            _ => false,
        }
    }

    /// True if no value can satisfy the range, e.g. `(5, 5)` or `[7, 3]`.
    pub fn is_empty(&self) -> bool {
        !lower_le_upper(self, self)
    }

    /// Returns whether `value` falls inside the range. Null is only inside
    /// the unbounded range.
    pub fn contains(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.is_all();
        }
        let lower_ok = match &self.from {
            None => true,
            Some(from) => match value.cmp(from) {
                Ordering::Greater => true,
                Ordering::Equal => !self.exclude_lower,
                Ordering::Less => false,
            },
        };
        let upper_ok = match &self.to {
            None => true,
            Some(to) => match value.cmp(to) {
                Ordering::Less => true,
                Ordering::Equal => !self.exclude_upper,
                Ordering::Greater => false,
            },
        };
        lower_ok && upper_ok
    }

    /// Returns whether two ranges share at least one value.
    pub fn overlaps(&self, other: &KeyRange) -> bool {
        lower_le_upper(self, other) && lower_le_upper(other, self)
    }

    /// The intersection of two ranges, or `None` when they are disjoint.
    pub fn intersect(&self, other: &KeyRange) -> Option<KeyRange> {
        let lower = if cmp_lower(self, other) == Ordering::Less {
            other
        } else {
            self
        };
        let upper = if cmp_upper(self, other) == Ordering::Greater {
            other
        } else {
            self
        };
        let range = KeyRange::new(
            lower.from.clone(),
            upper.to.clone(),
            lower.exclude_lower,
            upper.exclude_upper,
        );
        (!range.is_empty()).then_some(range)
    }

    /// The smallest range covering both inputs.
    pub fn bounding(&self, other: &KeyRange) -> KeyRange {
        let lower = if cmp_lower(self, other) == Ordering::Greater {
            other
        } else {
            self
        };
        let upper = if cmp_upper(self, other) == Ordering::Less {
            other
        } else {
            self
        };
        KeyRange::new(
            lower.from.clone(),
            upper.to.clone(),
            lower.exclude_lower,
            upper.exclude_upper,
        )
    }

    /// The ranges covering every value this range excludes.
    pub fn complement(&self) -> Vec<KeyRange> {
        let mut out = Vec::new();
        if let Some(from) = &self.from {
            out.push(KeyRange::upper_bound(from.clone(), !self.exclude_lower));
        }
        if let Some(to) = &self.to {
            out.push(KeyRange::lower_bound(to.clone(), !self.exclude_upper));
        }
        out
    }

    /// Swaps the bounds; used when walking a range in descending order.
    pub fn reverse(&self) -> KeyRange {
        KeyRange {
            from: self.to.clone(),
            to: self.from.clone(),
            exclude_lower: self.exclude_upper,
            exclude_upper: self.exclude_lower,
        }
    }

    /// Returns whether the union of the two ranges is a single interval.
    fn mergeable(&self, other: &KeyRange) -> bool {
        self.overlaps(other) || touches(self, other) || touches(other, self)
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.exclude_lower { "(" } else { "[" })?;
        match &self.from {
            Some(v) => write!(f, "{}", v)?,
            None => f.write_str("unbound")?,
        }
        f.write_str(", ")?;
        match &self.to {
            Some(v) => write!(f, "{}", v)?,
            None => f.write_str("unbound")?,
        }
        f.write_str(if self.exclude_upper { ")" } else { "]" })
    }
}

/// Orders ranges by their lower bound; unbound sorts first and an inclusive
/// bound sorts before an exclusive one on the same value.
pub fn cmp_lower(a: &KeyRange, b: &KeyRange) -> Ordering {
    match (&a.from, &b.from) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y).then(a.exclude_lower.cmp(&b.exclude_lower)),
    }
}

/// Orders ranges by their upper bound; unbound sorts last and an exclusive
/// bound sorts before an inclusive one on the same value.
pub fn cmp_upper(a: &KeyRange, b: &KeyRange) -> Ordering {
    match (&a.to, &b.to) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y).then(b.exclude_upper.cmp(&a.exclude_upper)),
    }
}

/// Whether `lo`'s lower bound is at or below `hi`'s upper bound.
fn lower_le_upper(lo: &KeyRange, hi: &KeyRange) -> bool {
    match (&lo.from, &hi.to) {
        (None, _) | (_, None) => true,
        (Some(x), Some(y)) => match x.cmp(y) {
            Ordering::Less => true,
            Ordering::Equal => !lo.exclude_lower && !hi.exclude_upper,
            Ordering::Greater => false,
        },
    }
}

/// `a` ends exactly where `b` starts with no value missing in between.
fn touches(a: &KeyRange, b: &KeyRange) -> bool {
    match (&a.to, &b.from) {
        (Some(x), Some(y)) => x == y && !(a.exclude_upper && b.exclude_lower),
        _ => false,
    }
}

/// A sorted union of non-overlapping ranges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SingleKeyRangeSet {
    ranges: Vec<KeyRange>,
}

impl SingleKeyRangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from arbitrary, possibly overlapping ranges.
    pub fn from_ranges(ranges: impl IntoIterator<Item = KeyRange>) -> Self {
        let mut set = Self::new();
        for range in ranges {
            set.push(range);
        }
        set.normalize();
        set
    }

    /// Adds a range, merging it with any range it overlaps or touches.
    pub fn add(&mut self, range: KeyRange) {
        self.push(range);
        self.normalize();
    }

    pub fn values(&self) -> &[KeyRange] {
        &self.ranges
    }

    pub fn into_values(self) -> Vec<KeyRange> {
        self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_all(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_all()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.ranges.iter().any(|r| r.contains(value))
    }

    /// Values present in both sets.
    pub fn intersect(a: &SingleKeyRangeSet, b: &SingleKeyRangeSet) -> SingleKeyRangeSet {
        let mut out = SingleKeyRangeSet::new();
        for x in &a.ranges {
            for y in &b.ranges {
                if let Some(r) = x.intersect(y) {
                    out.push(r);
                }
            }
        }
        out.normalize();
        out
    }

    /// Values present in neither range of the set.
    pub fn complement(&self) -> SingleKeyRangeSet {
        let mut out = SingleKeyRangeSet::from_ranges([KeyRange::all()]);
        for range in &self.ranges {
            let gaps = SingleKeyRangeSet::from_ranges(range.complement());
            out = SingleKeyRangeSet::intersect(&out, &gaps);
        }
        out
    }

    fn push(&mut self, range: KeyRange) {
        if !range.is_empty() {
            self.ranges.push(range);
        }
    }

    fn normalize(&mut self) {
        if self.ranges.len() < 2 {
            return;
        }
        self.ranges.sort_by(cmp_lower);
        let mut merged: Vec<KeyRange> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(last) if last.mergeable(&range) => *last = last.bounding(&range),
                _ => merged.push(range),
            }
        }
        self.ranges = merged;
    }
}

/// The range an index scan is bounded by, one `KeyRange` per indexed column.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexRange {
    Single(KeyRange),
    Composite(Vec<KeyRange>),
}

impl IndexRange {
    /// Per-column ranges.
    pub fn columns(&self) -> &[KeyRange] {
        match self {
            IndexRange::Single(r) => core::slice::from_ref(r),
            IndexRange::Composite(rs) => rs,
        }
    }

    pub fn is_all(&self) -> bool {
        self.columns().iter().all(KeyRange::is_all)
    }

    /// True when every column is pinned to one value.
    pub fn is_only(&self) -> bool {
        self.columns().iter().all(KeyRange::is_only)
    }
}

impl From<KeyRange> for IndexRange {
    fn from(r: KeyRange) -> Self {
        IndexRange::Single(r)
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexRange::Single(r) => write!(f, "{}", r),
            IndexRange::Composite(rs) => {
                f.write_str("[")?;
                for (i, r) in rs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", r)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn v(i: i64) -> Value {
        Value::Int64(i)
    }

    fn closed(a: i64, b: i64) -> KeyRange {
        KeyRange::new(Some(v(a)), Some(v(b)), false, false)
    }

    #[test]
    fn test_contains() {
        let r = KeyRange::new(Some(v(10)), Some(v(20)), true, false);
        assert!(!r.contains(&v(10)));
        assert!(r.contains(&v(11)));
        assert!(r.contains(&v(20)));
        assert!(!r.contains(&v(21)));
        assert!(!r.contains(&Value::Null));
        assert!(KeyRange::all().contains(&Value::Null));
        assert!(KeyRange::only(v(3)).is_only());
    }

    #[test]
    fn test_complement_of_closed_range() {
        let c = closed(10, 20).complement();
        assert_eq!(c.len(), 2);
        assert_eq!(c[0], KeyRange::upper_bound(v(10), true));
        assert_eq!(c[1], KeyRange::lower_bound(v(20), true));
        assert_eq!(c[0].to_string(), "[unbound, 10)");
        assert_eq!(c[1].to_string(), "(20, unbound]");
        assert!(KeyRange::all().complement().is_empty());
    }

    #[test]
    fn test_overlap_and_intersect() {
        assert!(closed(1, 5).overlaps(&closed(5, 9)));
        let half_open = KeyRange::new(Some(v(1)), Some(v(5)), false, true);
        assert!(!half_open.overlaps(&closed(5, 9)));
        assert_eq!(closed(1, 5).intersect(&closed(3, 9)), Some(closed(3, 5)));
        assert_eq!(half_open.intersect(&closed(5, 9)), None);
        assert!(KeyRange::new(Some(v(5)), Some(v(5)), true, false).is_empty());
    }

    #[test]
    fn test_set_merges_adjacent_ranges() {
        let mut set = SingleKeyRangeSet::new();
        set.add(KeyRange::new(Some(v(5)), Some(v(9)), false, false));
        set.add(KeyRange::new(Some(v(1)), Some(v(5)), false, true));
        set.add(closed(20, 30));
        set.add(closed(25, 40));
        assert_eq!(set.values(), &[closed(1, 9), closed(20, 40)]);

        // (1,5) and (5,9) leave 5 uncovered
        let gap = SingleKeyRangeSet::from_ranges([
            KeyRange::new(Some(v(1)), Some(v(5)), true, true),
            KeyRange::new(Some(v(5)), Some(v(9)), true, true),
        ]);
        assert_eq!(gap.values().len(), 2);
        assert!(!gap.contains(&v(5)));
    }

    #[test]
    fn test_set_intersect_and_complement() {
        let a = SingleKeyRangeSet::from_ranges([closed(1, 10), closed(20, 30)]);
        let b = SingleKeyRangeSet::from_ranges([closed(5, 25)]);
        let i = SingleKeyRangeSet::intersect(&a, &b);
        assert_eq!(i.values(), &[closed(5, 10), closed(20, 25)]);

        let c = a.complement();
        assert_eq!(
            c.values(),
            &[
                KeyRange::upper_bound(v(1), true),
                KeyRange::new(Some(v(10)), Some(v(20)), true, true),
                KeyRange::lower_bound(v(30), true),
            ]
        );
        assert_eq!(c.complement(), a);
        assert!(SingleKeyRangeSet::new().complement().is_all());
    }
}
