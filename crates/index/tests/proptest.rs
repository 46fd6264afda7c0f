//! Property-based tests for trellis-index using proptest.

use proptest::prelude::*;
use std::collections::BTreeMap;
use trellis_core::schema::Order;
use trellis_core::Value;
use trellis_index::{BTreeIndex, Index, IndexRange, Key, KeyComparator, KeyRange, SingleKeyRangeSet};

fn bound() -> impl Strategy<Value = Option<(i64, bool)>> {
    prop::option::of((0i64..200, any::<bool>()))
}

fn key_range() -> impl Strategy<Value = KeyRange> {
    (bound(), bound()).prop_map(|(lo, hi)| {
        KeyRange::new(
            lo.map(|(v, _)| Value::Int64(v)),
            hi.map(|(v, _)| Value::Int64(v)),
            lo.map_or(false, |(_, e)| e),
            hi.map_or(false, |(_, e)| e),
        )
    })
}

proptest! {
    /// get_range returns exactly the ids whose keys satisfy the range, in
    /// index order, and cost agrees with the result size.
    #[test]
    fn btree_range_matches_model(
        keys in prop::collection::vec(0i64..200, 0..400),
        range in key_range(),
        desc in any::<bool>(),
        order in 4usize..16,
    ) {
        let comparator = if desc { KeyComparator::desc() } else { KeyComparator::asc() };
        let mut tree = BTreeIndex::with_order("t.idx", false, comparator, order);
        let mut model: BTreeMap<i64, Vec<u64>> = BTreeMap::new();
        for (i, &k) in keys.iter().enumerate() {
            tree.add(Key::from(k), i as u64).unwrap();
            model.entry(k).or_default().push(i as u64);
        }

        let mut expected: Vec<u64> = Vec::new();
        let matching: Vec<(&i64, &Vec<u64>)> = model
            .iter()
            .filter(|(k, _)| range.contains(&Value::Int64(**k)))
            .collect();
        let ordered: Box<dyn Iterator<Item = _>> = if desc {
            Box::new(matching.into_iter().rev())
        } else {
            Box::new(matching.into_iter())
        };
        for (_, ids) in ordered {
            expected.extend(ids);
        }

        let index_range = IndexRange::Single(range);
        let got = tree.get_range(&[index_range.clone()], false, None, 0);
        prop_assert_eq!(&got, &expected);
        prop_assert_eq!(tree.cost(Some(&index_range)), got.len());
    }

    /// Interleaved adds and removes keep the tree consistent with a model.
    #[test]
    fn btree_add_remove_model(
        ops in prop::collection::vec((any::<bool>(), 0i64..100), 1..600),
        order in 4usize..10,
    ) {
        let mut tree = BTreeIndex::with_order("t.pk", true, KeyComparator::asc(), order);
        let mut model: BTreeMap<i64, u64> = BTreeMap::new();
        for (add, k) in ops {
            if add {
                let ok = tree.add(Key::from(k), k as u64).is_ok();
                prop_assert_eq!(ok, model.insert(k, k as u64).is_none());
            } else {
                tree.remove(&Key::from(k), None);
                model.remove(&k);
            }
        }
        let all = tree.get_range(&[], false, None, 0);
        let expected: Vec<u64> = model.values().copied().collect();
        prop_assert_eq!(&all, &expected);
        prop_assert_eq!(tree.len(), model.len());
        let rev = tree.get_range(&[], true, None, 0);
        prop_assert_eq!(rev, expected.into_iter().rev().collect::<Vec<_>>());
    }

    /// Complementing a range set twice restores it, and no value is in both
    /// a set and its complement.
    #[test]
    fn range_set_complement_is_involutive(
        ranges in prop::collection::vec(key_range(), 0..5),
        point in 0i64..200,
    ) {
        let set = SingleKeyRangeSet::from_ranges(ranges);
        let complement = set.complement();
        prop_assert_eq!(complement.complement(), set.clone());
        let v = Value::Int64(point);
        prop_assert!(set.contains(&v) != complement.contains(&v));
    }

    /// Ranges inside a set stay sorted and pairwise disjoint.
    #[test]
    fn range_set_is_normalized(ranges in prop::collection::vec(key_range(), 0..8)) {
        let set = SingleKeyRangeSet::from_ranges(ranges);
        for pair in set.values().windows(2) {
            prop_assert!(!pair[0].overlaps(&pair[1]));
            prop_assert!(pair[0].to.is_some());
        }
    }
}

#[test]
fn composite_descending_scan() {
    let comparator = KeyComparator::new(vec![Order::Desc, Order::Asc]);
    let mut tree = BTreeIndex::new("t.idx", true, comparator);
    for (id, (a, b)) in [(1, 1), (1, 2), (2, 1), (2, 2)].into_iter().enumerate() {
        tree.add(Key::from(vec![Value::Int64(a), Value::Int64(b)]), id as u64)
            .unwrap();
    }
    assert_eq!(tree.get_range(&[], false, None, 0), vec![2, 3, 0, 1]);
}
