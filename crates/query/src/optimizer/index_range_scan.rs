//! Index range scan pass - replaces a full table scan plus filters with an
//! index lookup when an index covers the filtered columns.
//!
//! Example:
//! ```text
//! Select(t.a eq 1)                 Select(t.b match x)
//!        |                                 |
//! Select(t.b match x)      =>    TableAccessByRowId(t)
//!        |                                 |
//! TableAccessFull(t)            IndexRangeScan(t.idxA)
//! ```
//!
//! An index qualifies when the consecutive Selects right above the table scan
//! bound a prefix of its columns. Among qualifying indices the one with the
//! lowest estimated cost wins; ties go to the index declared first.

use crate::context::QueryContext;
use crate::optimizer::PhysicalPass;
use crate::planner::{NodeId, PhysicalNode, PhysicalPlan};
use crate::predicate::{Predicate, TableRef};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use trellis_core::schema::{IndexDef, Schema};
use trellis_index::{IndexRange, KeyRange, SingleKeyRangeSet};
use trellis_storage::IndexStore;

pub struct IndexRangeScanPass<'a> {
    schema: &'a Schema,
    indices: &'a IndexStore,
}

struct Candidate {
    index: String,
    predicates: Vec<Predicate>,
    cost: usize,
}

impl<'a> IndexRangeScanPass<'a> {
    pub fn new(schema: &'a Schema, indices: &'a IndexStore) -> Self {
        Self { schema, indices }
    }

    /// Selects stacked directly above `scan`, nearest first.
    fn selects_above(plan: &PhysicalPlan, scan: NodeId) -> Vec<(NodeId, Predicate)> {
        let mut out = Vec::new();
        let mut current = plan.tree.parent(scan);
        while let Some(id) = current {
            match plan.tree.get(id) {
                PhysicalNode::Select(p) => out.push((id, p.clone())),
                _ => break,
            }
            current = plan.tree.parent(id);
        }
        out
    }

    fn best_candidate(&self, table: &TableRef, predicates: &[Predicate]) -> Option<Candidate> {
        let schema_table = self.schema.table(&table.name).ok()?;
        let mut best: Option<Candidate> = None;
        for def in schema_table.indices() {
            let used = covering_predicates(def, table, predicates);
            if used.is_empty() {
                continue;
            }
            let Some(index) = self.indices.get(&def.normalized_name()) else {
                continue;
            };
            let cost = key_ranges(def, table, &used)
                .iter()
                .map(|r| index.cost(Some(r)))
                .sum();
            if best.as_ref().map_or(true, |b| cost < b.cost) {
                best = Some(Candidate {
                    index: def.normalized_name(),
                    predicates: used,
                    cost,
                });
            }
        }
        best
    }
}

impl PhysicalPass for IndexRangeScanPass<'_> {
    fn optimize(&self, mut plan: PhysicalPlan, _query: &QueryContext) -> PhysicalPlan {
        let scans = plan
            .tree
            .find(|n| matches!(n, PhysicalNode::TableAccessFull(_)));
        for scan in scans {
            let PhysicalNode::TableAccessFull(table) = plan.tree.get(scan).clone() else {
                continue;
            };
            let selects = Self::selects_above(&plan, scan);
            let predicates: Vec<Predicate> = selects.iter().map(|(_, p)| p.clone()).collect();
            let Some(candidate) = self.best_candidate(&table, &predicates) else {
                continue;
            };

            for (id, predicate) in &selects {
                if candidate.predicates.iter().any(|p| p.id() == predicate.id()) {
                    plan.tree.remove_node(*id);
                }
            }
            let fetch = plan.tree.add(PhysicalNode::TableAccessByRowId(table.clone()));
            let lookup = plan.tree.add(PhysicalNode::IndexRangeScan {
                table,
                index: candidate.index,
                predicates: candidate.predicates,
                use_limit: false,
                use_skip: false,
            });
            plan.tree.add_child(fetch, lookup);
            plan.tree.replace_node_with_chain(scan, fetch, lookup);
        }
        plan
    }

    fn name(&self) -> &'static str {
        "index_range_scan"
    }
}

fn on_column(predicate: &Predicate, table: &TableRef, column: &str) -> bool {
    predicate.is_key_range_compatible()
        && predicate
            .key_range_column()
            .map_or(false, |c| c.table == table.effective_name() && c.name == column)
}

/// Predicates usable by `def`, covering the longest prefix of its columns.
fn covering_predicates(def: &IndexDef, table: &TableRef, predicates: &[Predicate]) -> Vec<Predicate> {
    let mut used = Vec::new();
    for column in def.columns() {
        let matching: Vec<&Predicate> = predicates
            .iter()
            .filter(|p| on_column(p, table, &column.name))
            .collect();
        if matching.is_empty() {
            break;
        }
        used.extend(matching.into_iter().cloned());
    }
    used
}

/// Ranges to scan `def` with so that exactly the rows satisfying every one
/// of `predicates` come back.
///
/// Predicates on one column intersect. Columns past the bound prefix scan
/// their full range. An empty result means no row can match.
pub(crate) fn key_ranges(def: &IndexDef, table: &TableRef, predicates: &[Predicate]) -> Vec<IndexRange> {
    let mut per_column: Vec<Vec<KeyRange>> = Vec::with_capacity(def.columns().len());
    for column in def.columns() {
        let mut set: Option<SingleKeyRangeSet> = None;
        for p in predicates.iter().filter(|p| on_column(p, table, &column.name)) {
            let ranges = p.to_key_range_set();
            set = Some(match set {
                Some(current) => SingleKeyRangeSet::intersect(&current, &ranges),
                None => ranges,
            });
        }
        let ranges = match set {
            Some(set) => set.into_values(),
            None => vec![KeyRange::all()],
        };
        if ranges.is_empty() {
            return Vec::new();
        }
        per_column.push(ranges);
    }

    if def.is_single_column() {
        return per_column
            .into_iter()
            .flatten()
            .map(IndexRange::Single)
            .collect();
    }
    let mut combinations: Vec<Vec<KeyRange>> = vec![Vec::new()];
    for ranges in per_column {
        let mut next = Vec::with_capacity(combinations.len() * ranges.len());
        for prefix in &combinations {
            for range in &ranges {
                let mut combination = prefix.clone();
                combination.push(range.clone());
                next.push(combination);
            }
        }
        combinations = next;
    }
    combinations.into_iter().map(IndexRange::Composite).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SelectContext;
    use crate::planner::{LogicalPlanGenerator, PhysicalPlanFactory, PlannerOptions};
    use alloc::rc::Rc;
    use trellis_core::schema::TableBuilder;
    use trellis_core::{DataType, Row};
    use trellis_storage::{Cache, Journal};

    fn schema() -> Schema {
        let t = TableBuilder::new("t")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("a", DataType::Int64)
            .unwrap()
            .add_column("b", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_index("idxA", &["a"], false)
            .unwrap()
            .add_index("idxAB", &["a", "b"], false)
            .unwrap()
            .build()
            .unwrap();
        Schema::new("db", 1, vec![t]).unwrap()
    }

    fn populated(schema: &Schema) -> IndexStore {
        let mut cache = Cache::new();
        let mut indices = IndexStore::new();
        indices.init(schema);
        let mut journal = Journal::new(schema, &["t"]);
        let rows = (0..20i64)
            .map(|i| Rc::new(Row::builder(i as u64 + 1).set("id", i).set("a", i % 2).set("b", i).build()))
            .collect();
        journal.insert(&mut cache, &mut indices, "t", rows).unwrap();
        journal.commit();
        indices
    }

    fn explain(schema: &Schema, indices: &IndexStore, query: &QueryContext) -> String {
        let mut generator = LogicalPlanGenerator::new(query);
        let factory = PhysicalPlanFactory::new(schema, indices, PlannerOptions::default());
        factory.create(generator.generate(), query).explain()
    }

    #[test]
    fn test_cheapest_index_wins() {
        let schema = schema();
        let indices = populated(&schema);
        let t = TableRef::new("t");

        // a = 1 matches half the table, id = 3 a single row.
        let query: QueryContext = SelectContext::new()
            .from(t.clone())
            .filter(t.col("a").equals(1))
            .filter(t.col("id").equals(3))
            .into();
        assert_eq!(
            explain(&schema, &indices, &query),
            "project()\n\
             -select(t.a eq 1)\n\
             --table_access_by_row_id(t)\n\
             ---index_range_scan(t.pkT)\n"
        );
    }

    #[test]
    fn test_composite_prefix_cost() {
        let schema = schema();
        let indices = populated(&schema);
        let t = TableRef::new("t");
        let query: QueryContext = SelectContext::new()
            .from(t.clone())
            .filter(t.col("a").equals(0))
            .filter(t.col("b").lt(4))
            .into();
        // idxAB bounds both columns and is cheaper than idxA alone.
        assert_eq!(
            explain(&schema, &indices, &query),
            "project()\n-table_access_by_row_id(t)\n--index_range_scan(t.idxAB)\n"
        );
    }

    #[test]
    fn test_unindexed_filter_keeps_full_scan() {
        let schema = schema();
        let indices = populated(&schema);
        let t = TableRef::new("t");
        let query: QueryContext = SelectContext::new()
            .from(t.clone())
            .filter(t.col("b").gt(4))
            .into();
        assert_eq!(
            explain(&schema, &indices, &query),
            "project()\n-select(t.b gt 4)\n--table_access(t)\n"
        );
    }

    #[test]
    fn test_key_ranges_intersect_and_expand() {
        let schema = schema();
        let t = TableRef::new("t");
        let def = schema.table("t").unwrap().get_index("idxAB").unwrap();

        let ranges = key_ranges(def, &t, &[t.col("a").in_list([1i64, 2]), t.col("b").gt(3)]);
        assert_eq!(ranges.len(), 2);
        assert!(matches!(&ranges[0], IndexRange::Composite(c) if c.len() == 2));

        let contradiction = key_ranges(def, &t, &[t.col("a").gt(5), t.col("a").lt(3)]);
        assert!(contradiction.is_empty());
    }
}
