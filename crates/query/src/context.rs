//! Query contexts: the structured form of SELECT / INSERT / UPDATE / DELETE.
//!
//! A context is what the planner compiles and what execution steps consult
//! for bound parameters, limits and skips. Contexts are cheap to clone; a
//! compiled plan stays valid for every clone because predicates are matched
//! by id.

use crate::predicate::{ColumnRef, Operand, Operator, Predicate, PredicateId, TableRef};
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use trellis_core::schema::{Order, Schema};
use trellis_core::{Error, Result, Row, Value};

/// Aggregate functions usable in a projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    Avg,
    Count,
    Distinct,
    GeoMean,
    Max,
    Min,
    StdDev,
    Sum,
}

impl AggregateFunc {
    fn name(self) -> &'static str {
        match self {
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Distinct => "DISTINCT",
            AggregateFunc::GeoMean => "GEOMEAN",
            AggregateFunc::Max => "MAX",
            AggregateFunc::Min => "MIN",
            AggregateFunc::StdDev => "STDDEV",
            AggregateFunc::Sum => "SUM",
        }
    }
}

/// An aggregate over a column, or over whole rows for `COUNT(*)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregatedColumn {
    pub func: AggregateFunc,
    /// `None` only for `COUNT(*)`.
    pub target: Option<ColumnRef>,
    /// Aggregate over distinct values, e.g. `COUNT(DISTINCT c)`.
    pub distinct_input: bool,
    pub alias: Option<String>,
}

impl AggregatedColumn {
    pub fn new(func: AggregateFunc, target: ColumnRef) -> Self {
        Self {
            func,
            target: Some(target),
            distinct_input: false,
            alias: None,
        }
    }

    pub fn count_star() -> Self {
        Self {
            func: AggregateFunc::Count,
            target: None,
            distinct_input: false,
            alias: None,
        }
    }

    pub fn distinct_input(mut self) -> Self {
        self.distinct_input = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Key of the result in a relation's aggregations, e.g. `COUNT(*)` or
    /// `SUM(DISTINCT(t.c))`.
    pub fn name(&self) -> String {
        let target = match &self.target {
            None => String::from("*"),
            Some(c) if self.distinct_input => format!("DISTINCT({})", c.normalized_name()),
            Some(c) => c.normalized_name(),
        };
        format!("{}({})", self.func.name(), target)
    }

    pub fn is_count_star(&self) -> bool {
        self.func == AggregateFunc::Count && self.target.is_none()
    }
}

/// One entry of a SELECT list or ORDER BY clause.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SelectColumn {
    Column(ColumnRef),
    Aggregate(AggregatedColumn),
}

impl SelectColumn {
    /// Name of the column in result rows.
    pub fn output_name(&self, prefixed: bool) -> String {
        match self {
            SelectColumn::Column(c) => match &c.alias {
                Some(alias) => alias.clone(),
                None if prefixed => c.normalized_name(),
                None => c.name.clone(),
            },
            SelectColumn::Aggregate(a) => a.alias.clone().unwrap_or_else(|| a.name()),
        }
    }

    pub fn as_aggregate(&self) -> Option<&AggregatedColumn> {
        match self {
            SelectColumn::Aggregate(a) => Some(a),
            SelectColumn::Column(_) => None,
        }
    }
}

impl From<ColumnRef> for SelectColumn {
    fn from(c: ColumnRef) -> Self {
        SelectColumn::Column(c)
    }
}

impl From<AggregatedColumn> for SelectColumn {
    fn from(a: AggregatedColumn) -> Self {
        SelectColumn::Aggregate(a)
    }
}

impl fmt::Display for SelectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectColumn::Column(c) => f.write_str(&c.normalized_name()),
            SelectColumn::Aggregate(a) => f.write_str(&a.name()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderKey {
    pub column: SelectColumn,
    pub order: Order,
}

fn and_into(slot: &mut Option<Predicate>, predicate: Predicate) {
    *slot = Some(match slot.take() {
        None => predicate,
        Some(Predicate::Combined(mut c)) if c.op == Operator::And && !c.is_complement() => {
            c.children.push(predicate);
            Predicate::Combined(c)
        }
        Some(existing) => Predicate::and(alloc::vec![existing, predicate]),
    });
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectContext {
    /// Empty selects every column.
    pub columns: Vec<SelectColumn>,
    pub from: Vec<TableRef>,
    pub where_clause: Option<Predicate>,
    pub outer_join_predicates: BTreeSet<PredicateId>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl SelectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, column: impl Into<SelectColumn>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn from(mut self, table: impl Into<TableRef>) -> Self {
        self.from.push(table.into());
        self
    }

    /// Adds a WHERE condition, ANDed with any existing one.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        and_into(&mut self.where_clause, predicate);
        self
    }

    pub fn inner_join(self, table: impl Into<TableRef>, on: Predicate) -> Self {
        self.from(table).filter(on)
    }

    /// Left outer join; `on` must be a join predicate.
    pub fn left_outer_join(mut self, table: impl Into<TableRef>, on: Predicate) -> Self {
        self.outer_join_predicates.insert(on.id());
        self.from(table).filter(on)
    }

    pub fn group_by(mut self, column: ColumnRef) -> Self {
        self.group_by.push(column);
        self
    }

    pub fn order_by(mut self, column: impl Into<SelectColumn>, order: Order) -> Self {
        self.order_by.push(OrderKey {
            column: column.into(),
            order,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn aggregates(&self) -> impl Iterator<Item = &AggregatedColumn> {
        self.columns
            .iter()
            .chain(self.order_by.iter().map(|k| &k.column))
            .filter_map(SelectColumn::as_aggregate)
    }

    pub fn has_aggregates(&self) -> bool {
        self.aggregates().next().is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertContext {
    pub table: String,
    pub values: Vec<Row>,
    pub allow_replace: bool,
}

impl InsertContext {
    /// Row ids of `values` are replaced when the rows are inserted.
    pub fn new(table: impl Into<String>, values: Vec<Row>) -> Self {
        Self {
            table: table.into(),
            values,
            allow_replace: false,
        }
    }

    pub fn or_replace(mut self) -> Self {
        self.allow_replace = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateContext {
    pub table: TableRef,
    pub set: Vec<(String, Operand)>,
    pub where_clause: Option<Predicate>,
}

impl UpdateContext {
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            where_clause: None,
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((column.into(), Operand::Value(value.into())));
        self
    }

    pub fn set_param(mut self, column: impl Into<String>, index: usize) -> Self {
        self.set.push((column.into(), Operand::param(index)));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        and_into(&mut self.where_clause, predicate);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteContext {
    pub from: TableRef,
    pub where_clause: Option<Predicate>,
}

impl DeleteContext {
    pub fn new(from: impl Into<TableRef>) -> Self {
        Self {
            from: from.into(),
            where_clause: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        and_into(&mut self.where_clause, predicate);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryContext {
    Select(SelectContext),
    Insert(InsertContext),
    Update(UpdateContext),
    Delete(DeleteContext),
}

impl QueryContext {
    pub fn is_read_only(&self) -> bool {
        matches!(self, QueryContext::Select(_))
    }

    pub fn as_select(&self) -> Option<&SelectContext> {
        match self {
            QueryContext::Select(s) => Some(s),
            _ => None,
        }
    }

    /// Tables named by the query itself.
    pub fn tables(&self) -> Vec<TableRef> {
        match self {
            QueryContext::Select(s) => s.from.clone(),
            QueryContext::Insert(i) => alloc::vec![TableRef::new(i.table.as_str())],
            QueryContext::Update(u) => alloc::vec![u.table.clone()],
            QueryContext::Delete(d) => alloc::vec![d.from.clone()],
        }
    }

    pub fn where_clause(&self) -> Option<&Predicate> {
        match self {
            QueryContext::Select(s) => s.where_clause.as_ref(),
            QueryContext::Insert(_) => None,
            QueryContext::Update(u) => u.where_clause.as_ref(),
            QueryContext::Delete(d) => d.where_clause.as_ref(),
        }
    }

    fn where_clause_mut(&mut self) -> Option<&mut Predicate> {
        match self {
            QueryContext::Select(s) => s.where_clause.as_mut(),
            QueryContext::Insert(_) => None,
            QueryContext::Update(u) => u.where_clause.as_mut(),
            QueryContext::Delete(d) => d.where_clause.as_mut(),
        }
    }

    pub fn find_predicate(&self, id: PredicateId) -> Option<&Predicate> {
        self.where_clause().and_then(|p| p.find(id))
    }

    pub fn limit(&self) -> Option<usize> {
        self.as_select().and_then(|s| s.limit)
    }

    pub fn skip(&self) -> Option<usize> {
        self.as_select().and_then(|s| s.skip)
    }

    /// Tables a task running this query must lock.
    ///
    /// Writes pull in foreign-key neighbours: parents are read to check
    /// references, children may be cascaded into or must be checked for
    /// dangling references.
    pub fn scope(&self, schema: &Schema) -> Result<BTreeSet<String>> {
        let mut scope = BTreeSet::new();
        match self {
            QueryContext::Select(s) => {
                for t in &s.from {
                    scope.insert(String::from(schema.table(&t.name)?.name()));
                }
            }
            QueryContext::Insert(i) => {
                scope.insert(String::from(schema.table(&i.table)?.name()));
                add_parents(schema, &i.table, &mut scope);
                if i.allow_replace {
                    add_children(schema, &i.table, &mut scope);
                }
            }
            QueryContext::Update(u) => {
                scope.insert(String::from(schema.table(&u.table.name)?.name()));
                add_parents(schema, &u.table.name, &mut scope);
                add_children(schema, &u.table.name, &mut scope);
            }
            QueryContext::Delete(d) => {
                scope.insert(String::from(schema.table(&d.from.name)?.name()));
                add_children(schema, &d.from.name, &mut scope);
            }
        }
        Ok(scope)
    }

    /// Fills parameter placeholders in the WHERE clause and the SET list.
    pub fn bind(&mut self, params: &[Value]) -> Result<()> {
        if let Some(predicate) = self.where_clause_mut() {
            predicate.bind(params)?;
        }
        if let QueryContext::Update(u) = self {
            for (_, operand) in &mut u.set {
                operand.bind(params)?;
            }
        }
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        let set_bound = match self {
            QueryContext::Update(u) => u.set.iter().all(|(_, o)| o.is_bound()),
            _ => true,
        };
        set_bound && self.where_clause().map_or(true, Predicate::is_bound)
    }

    /// Checks the query against `schema` before it is planned.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        let tables = self.tables();
        for t in &tables {
            schema.table(&t.name)?;
        }
        let mut names = BTreeSet::new();
        for t in &tables {
            if !names.insert(t.effective_name()) {
                return Err(Error::invalid_query(format!(
                    "Table {} appears twice without distinct aliases",
                    t.effective_name()
                )));
            }
        }

        let resolve = |column: &ColumnRef| -> Result<()> {
            let table = tables
                .iter()
                .find(|t| t.effective_name() == column.table)
                .ok_or_else(|| {
                    Error::invalid_query(format!(
                        "Column {} refers to a table not in the query",
                        column.normalized_name()
                    ))
                })?;
            schema.table(&table.name)?.column(&column.name).map(|_| ())
        };

        if let Some(predicate) = self.where_clause() {
            predicate.columns().iter().try_for_each(resolve)?;
        }
        match self {
            QueryContext::Select(s) => {
                let listed = s.columns.iter().chain(s.order_by.iter().map(|k| &k.column));
                for column in listed {
                    match column {
                        SelectColumn::Column(c) => resolve(c)?,
                        SelectColumn::Aggregate(a) => {
                            if let Some(c) = &a.target {
                                resolve(c)?;
                            } else if !a.is_count_star() {
                                return Err(Error::invalid_query(format!(
                                    "{} needs a column",
                                    a.name()
                                )));
                            }
                        }
                    }
                }
                s.group_by.iter().try_for_each(resolve)?;
                for id in &s.outer_join_predicates {
                    if self.find_predicate(*id).and_then(Predicate::as_join).is_none() {
                        return Err(Error::invalid_query("Outer join condition must be a join predicate"));
                    }
                }
            }
            QueryContext::Insert(i) => {
                let table = schema.table(&i.table)?;
                if i.allow_replace && table.primary_key().is_none() {
                    return Err(Error::missing_primary_key(table.name()));
                }
            }
            QueryContext::Update(u) => {
                let table = schema.table(&u.table.name)?;
                if u.set.is_empty() {
                    return Err(Error::invalid_query("Update without a SET list"));
                }
                for (column, _) in &u.set {
                    table.column(column)?;
                }
            }
            QueryContext::Delete(_) => {}
        }
        Ok(())
    }
}

fn add_parents(schema: &Schema, table: &str, scope: &mut BTreeSet<String>) {
    for parent in schema.parent_tables(table) {
        scope.insert(String::from(parent.name()));
    }
}

fn add_children(schema: &Schema, table: &str, scope: &mut BTreeSet<String>) {
    for child in schema.child_tables(table) {
        if scope.insert(String::from(child.name())) {
            add_children(schema, child.name(), scope);
        }
    }
}

impl From<SelectContext> for QueryContext {
    fn from(c: SelectContext) -> Self {
        QueryContext::Select(c)
    }
}

impl From<InsertContext> for QueryContext {
    fn from(c: InsertContext) -> Self {
        QueryContext::Insert(c)
    }
}

impl From<UpdateContext> for QueryContext {
    fn from(c: UpdateContext) -> Self {
        QueryContext::Update(c)
    }
}

impl From<DeleteContext> for QueryContext {
    fn from(c: DeleteContext) -> Self {
        QueryContext::Delete(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use trellis_core::schema::{ConstraintAction, TableBuilder};
    use trellis_core::DataType;

    fn schema() -> Schema {
        let region = TableBuilder::new("region")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap();
        let country = TableBuilder::new("country")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("region", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_foreign_key("fkRegion", "region", "region", "id", ConstraintAction::Cascade)
            .unwrap()
            .build()
            .unwrap();
        let city = TableBuilder::new("city")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("country", DataType::Int64)
            .unwrap()
            .add_foreign_key("fkCountry", "country", "country", "id", ConstraintAction::Restrict)
            .unwrap()
            .build()
            .unwrap();
        Schema::new("geo", 1, vec![region, country, city]).unwrap()
    }

    fn names(scope: BTreeSet<String>) -> Vec<String> {
        scope.into_iter().collect()
    }

    #[test]
    fn test_scope_follows_foreign_keys() {
        let schema = schema();
        let select: QueryContext = SelectContext::new().from("country").into();
        assert_eq!(names(select.scope(&schema).unwrap()), vec!["country"]);

        let insert: QueryContext = InsertContext::new("country", vec![]).into();
        assert_eq!(names(insert.scope(&schema).unwrap()), vec!["country", "region"]);

        let delete: QueryContext = DeleteContext::new("region").into();
        assert_eq!(
            names(delete.scope(&schema).unwrap()),
            vec!["city", "country", "region"]
        );

        let update: QueryContext = UpdateContext::new("country").set("region", 1).into();
        assert_eq!(
            names(update.scope(&schema).unwrap()),
            vec!["city", "country", "region"]
        );
    }

    #[test]
    fn test_validate() {
        let schema = schema();
        let c = TableRef::new("country");
        let ok: QueryContext = SelectContext::new()
            .from(c.clone())
            .filter(c.col("region").equals(1))
            .into();
        assert!(ok.validate(&schema).is_ok());

        let bad_column: QueryContext = SelectContext::new()
            .from(c.clone())
            .filter(c.col("nope").equals(1))
            .into();
        assert!(matches!(
            bad_column.validate(&schema),
            Err(Error::ColumnNotFound { .. })
        ));

        let no_pk: QueryContext = InsertContext::new("city", vec![]).or_replace().into();
        assert!(matches!(
            no_pk.validate(&schema),
            Err(Error::MissingPrimaryKey { .. })
        ));

        let unknown: QueryContext = DeleteContext::new("planet").into();
        assert!(matches!(unknown.validate(&schema), Err(Error::TableNotFound { .. })));
    }

    #[test]
    fn test_bind_where_and_set() {
        let c = TableRef::new("country");
        let mut update: QueryContext = UpdateContext::new(c.clone())
            .set_param("region", 0)
            .filter(c.col("id").eq_param(1))
            .into();
        assert!(!update.is_bound());
        update.bind(&[Value::Int64(7), Value::Int64(3)]).unwrap();
        assert!(update.is_bound());
        let QueryContext::Update(u) = &update else {
            panic!("expected update");
        };
        assert_eq!(u.set[0].1.value(), Some(&Value::Int64(7)));
    }

    #[test]
    fn test_filters_are_anded() {
        let c = TableRef::new("country");
        let select = SelectContext::new()
            .from(c.clone())
            .filter(c.col("id").gt(1))
            .filter(c.col("id").lt(5))
            .filter(c.col("region").equals(2));
        let Some(Predicate::Combined(where_clause)) = &select.where_clause else {
            panic!("expected AND");
        };
        assert_eq!(where_clause.children.len(), 3);
    }

    #[test]
    fn test_aggregate_names() {
        let c = TableRef::new("country");
        assert_eq!(AggregatedColumn::count_star().name(), "COUNT(*)");
        let sum = AggregatedColumn::new(AggregateFunc::Sum, c.col("id")).distinct_input();
        assert_eq!(sum.name(), "SUM(DISTINCT(country.id))");
        let col = SelectColumn::from(sum.alias("total"));
        assert_eq!(col.output_name(false), "total");
    }
}
