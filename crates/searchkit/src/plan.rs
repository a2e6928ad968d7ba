//! Query plans.
//!
//! A [`QueryPlan`] is the backend-neutral form of a validated request:
//! resolved traversal nodes, typed conditions, orderings, the distinct flag,
//! and pagination. Plans are built per request by [`PlanBuilder`] and handed
//! to a [`QueryExecutor`](crate::QueryExecutor).

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use tracing::debug;

use crate::coerce::CoercionRegistry;
use crate::error::{InvalidRequest, Result, SearchError};
use crate::field::{Catalogue, SearchField};
use crate::op::FilterOperator;
use crate::request::{Direction, Filter, SearchRequest};
use crate::value::{Timestamp, Value};

/// Index of a traversal node within its plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinId(usize);

impl JoinId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for JoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "j{}", self.0)
    }
}

/// One relationship hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinNode {
    /// The node this hop starts from; `None` for the root record.
    pub parent: Option<JoinId>,
    /// Attribute traversed on the parent.
    pub attribute: String,
    /// Dotted path from the root up to and including this hop.
    pub path: String,
    /// Rows without a related record are dropped. Nodes only reached by
    /// orderings are optional, so missing relations sort as null instead.
    pub required: bool,
}

/// The traversal nodes of a plan, keyed by path prefix.
///
/// Each prefix is created once; later filters and sorts through the same
/// prefix reuse the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Joins {
    nodes: Vec<JoinNode>,
    by_path: HashMap<String, JoinId>,
}

impl Joins {
    /// Resolves every prefix of `hops`, creating missing nodes, and returns
    /// the node of the last hop. `None` when there are no hops.
    pub fn resolve(&mut self, hops: &[&str], required: bool) -> Option<JoinId> {
        let mut parent = None;
        let mut path = String::new();

        for hop in hops {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(hop);

            let id = match self.by_path.get(&path) {
                Some(&existing) => {
                    let node = &mut self.nodes[existing.0];
                    node.required |= required;
                    existing
                }
                None => {
                    let id = JoinId(self.nodes.len());
                    self.nodes.push(JoinNode {
                        parent,
                        attribute: (*hop).to_string(),
                        path: path.clone(),
                        required,
                    });
                    self.by_path.insert(path.clone(), id);
                    id
                }
            };
            parent = Some(id);
        }

        parent
    }

    pub fn get(&self, id: JoinId) -> Option<&JoinNode> {
        self.nodes.get(id.0)
    }

    /// Looks up the node for a dotted path prefix.
    pub fn find(&self, path: &str) -> Option<JoinId> {
        self.by_path.get(path).copied()
    }

    /// Nodes in creation order; parents always precede their children.
    pub fn iter(&self) -> impl Iterator<Item = (JoinId, &JoinNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (JoinId(i), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// What a condition or ordering reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A scalar attribute of the root (`join` is `None`) or of a joined record.
    Attribute { join: Option<JoinId>, name: String },
    /// The current element of a joined element collection.
    Element { join: JoinId },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Attribute { join: None, name } => write!(f, "root.{name}"),
            Target::Attribute {
                join: Some(join),
                name,
            } => write!(f, "{join}.{name}"),
            Target::Element { join } => write!(f, "{join}"),
        }
    }
}

/// Ordered comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Comparison {
    /// Whether `actual.cmp(bound)` satisfies this comparison.
    pub fn matches(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Comparison::GreaterThan => ordering == Greater,
            Comparison::GreaterThanOrEqual => ordering != Less,
            Comparison::LessThan => ordering == Less,
            Comparison::LessThanOrEqual => ordering != Greater,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEqual => ">=",
            Comparison::LessThan => "<",
            Comparison::LessThanOrEqual => "<=",
        }
    }

    fn from_operator(operator: FilterOperator) -> Option<Self> {
        match operator {
            FilterOperator::GreaterThan => Some(Comparison::GreaterThan),
            FilterOperator::GreaterThanOrEqual => Some(Comparison::GreaterThanOrEqual),
            FilterOperator::LessThan => Some(Comparison::LessThan),
            FilterOperator::LessThanOrEqual => Some(Comparison::LessThanOrEqual),
            _ => None,
        }
    }
}

/// The right-hand side of an ordered comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Instant(Timestamp),
}

impl Bound {
    /// Narrows a coerced value to a comparison bound.
    ///
    /// # Panics
    ///
    /// Panics on a value of an unordered type. The validator only admits
    /// comparisons on ordered types, so reaching this is a bug.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::I8(n) => Bound::Int(i64::from(*n)),
            Value::I16(n) => Bound::Int(i64::from(*n)),
            Value::I32(n) => Bound::Int(i64::from(*n)),
            Value::I64(n) => Bound::Int(*n),
            Value::F32(n) => Bound::Float(f64::from(*n)),
            Value::F64(n) => Bound::Float(*n),
            Value::Decimal(d) => Bound::Decimal(*d),
            Value::Instant(t) => Bound::Instant(*t),
            other => panic!(
                "comparison bound must be numeric or temporal, got a {} value",
                other.kind()
            ),
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            Bound::Int(n) => Value::I64(n),
            Bound::Float(n) => Value::F64(n),
            Bound::Decimal(d) => Value::Decimal(d),
            Bound::Instant(t) => Value::Instant(t),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_value(), f)
    }
}

/// A typed condition on one target.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    IsNull,
    IsNotNull,
    Equal(Value),
    NotEqual(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// Case-insensitive match against a lower-cased `%value%` pattern.
    Like(String),
    NotLike(String),
    Compare(Comparison, Bound),
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::IsNull => f.write_str("IS NULL"),
            Predicate::IsNotNull => f.write_str("IS NOT NULL"),
            Predicate::Equal(v) => write!(f, "= '{v}'"),
            Predicate::NotEqual(v) => write!(f, "<> '{v}'"),
            Predicate::In(vs) => write!(f, "IN ({})", join_values(vs)),
            Predicate::NotIn(vs) => write!(f, "NOT IN ({})", join_values(vs)),
            Predicate::Like(p) => write!(f, "ILIKE '{p}'"),
            Predicate::NotLike(p) => write!(f, "NOT ILIKE '{p}'"),
            Predicate::Compare(op, bound) => write!(f, "{} {bound}", op.as_str()),
        }
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One filter, resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Catalogue id of the filtered field.
    pub field: String,
    pub target: Target,
    pub predicate: Predicate,
}

/// One sort, resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub field: String,
    pub target: Target,
    pub direction: Direction,
}

/// What the plan selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Root records.
    Rows,
    /// The number of matching root records.
    Count,
}

/// A backend-neutral query over one root record type.
///
/// Conditions are conjoined. When `distinct` is set, each root record
/// appears at most once however many related records matched.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub record: String,
    pub projection: Projection,
    pub joins: Joins,
    pub conditions: Vec<Condition>,
    pub orderings: Vec<OrderClause>,
    pub distinct: bool,
    pub skip: u64,
    /// Row limit; `None` for count plans.
    pub take: Option<u64>,
}

impl QueryPlan {
    pub fn is_count(&self) -> bool {
        self.projection == Projection::Count
    }

    /// Conditions reading through `join`.
    pub fn conditions_on(&self, join: JoinId) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(move |c| match &c.target {
            Target::Attribute { join: j, .. } => *j == Some(join),
            Target::Element { join: j } => *j == join,
        })
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        match self.projection {
            Projection::Rows => write!(f, "root FROM {} root", self.record)?,
            Projection::Count => write!(f, "COUNT(root) FROM {} root", self.record)?,
        }
        for (id, node) in self.joins.iter() {
            let kind = if node.required { "JOIN" } else { "LEFT JOIN" };
            match node.parent {
                Some(parent) => write!(f, " {kind} {parent}.{} {id}", node.attribute)?,
                None => write!(f, " {kind} root.{} {id}", node.attribute)?,
            }
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            let keyword = if i == 0 { "WHERE" } else { "AND" };
            write!(f, " {keyword} {} {}", condition.target, condition.predicate)?;
        }
        for (i, order) in self.orderings.iter().enumerate() {
            let keyword = if i == 0 { " ORDER BY" } else { "," };
            write!(f, "{keyword} {} {}", order.target, order.direction)?;
        }
        if let Some(take) = self.take {
            write!(f, " OFFSET {} LIMIT {take}", self.skip)?;
        }
        Ok(())
    }
}

/// Translates validated requests into plans.
///
/// The builder trusts the request to have passed
/// [`RequestValidator`](crate::RequestValidator); unknown fields and
/// missing values are still reported as errors, but an ordered comparison on
/// an unordered type panics.
#[derive(Debug, Clone, Copy)]
pub struct PlanBuilder<'a> {
    catalogue: &'a Catalogue,
    coercion: &'a CoercionRegistry,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(catalogue: &'a Catalogue, coercion: &'a CoercionRegistry) -> Self {
        PlanBuilder {
            catalogue,
            coercion,
        }
    }

    /// Plan for one page of rows: filters, sorts, and pagination.
    pub fn page_plan(&self, request: &SearchRequest) -> Result<QueryPlan> {
        let mut joins = Joins::default();
        let mut distinct = false;

        let conditions = self.conditions(request, &mut joins, &mut distinct)?;

        let mut orderings = Vec::with_capacity(request.sorts.len());
        for sort in &request.sorts {
            let field = self.field(&sort.field)?;
            distinct |= field.distinct || field.multi_valued;
            orderings.push(OrderClause {
                field: field.id.clone(),
                target: resolve(&mut joins, field, false),
                direction: sort.direction,
            });
        }

        let plan = QueryPlan {
            record: self.catalogue.record().to_string(),
            projection: Projection::Rows,
            joins,
            conditions,
            orderings,
            distinct,
            skip: request.offset(),
            take: Some(u64::from(request.page_size)),
        };
        log_plan(&plan);
        Ok(plan)
    }

    /// Plan counting every row matching the filters. Sorts and pagination
    /// are ignored; traversal nodes are resolved afresh.
    pub fn count_plan(&self, request: &SearchRequest) -> Result<QueryPlan> {
        let mut joins = Joins::default();
        let mut distinct = false;

        let conditions = self.conditions(request, &mut joins, &mut distinct)?;

        let plan = QueryPlan {
            record: self.catalogue.record().to_string(),
            projection: Projection::Count,
            joins,
            conditions,
            orderings: Vec::new(),
            distinct,
            skip: 0,
            take: None,
        };
        log_plan(&plan);
        Ok(plan)
    }

    fn conditions(
        &self,
        request: &SearchRequest,
        joins: &mut Joins,
        distinct: &mut bool,
    ) -> Result<Vec<Condition>> {
        request
            .filters
            .iter()
            .map(|filter| {
                let field = self.field(&filter.field)?;
                *distinct |= field.distinct || field.multi_valued;
                let predicate = self.predicate(field, filter)?;
                Ok(Condition {
                    field: field.id.clone(),
                    target: resolve(joins, field, true),
                    predicate,
                })
            })
            .collect()
    }

    fn field(&self, id: &str) -> Result<&'a SearchField> {
        self.catalogue.get(id).ok_or_else(|| {
            SearchError::from(InvalidRequest::UnknownField {
                field: id.to_string(),
                known: self.catalogue.ids().map(str::to_string).collect(),
            })
        })
    }

    fn predicate(&self, field: &SearchField, filter: &Filter) -> Result<Predicate> {
        let operator = filter.operator;
        if !operator.requires_value() {
            return Ok(match operator {
                FilterOperator::IsNull => Predicate::IsNull,
                _ => Predicate::IsNotNull,
            });
        }

        let values = filter
            .values
            .iter()
            .map(|raw| self.coerce(field, raw))
            .collect::<Result<Vec<_>>>()?;
        let Some(first) = values.first().cloned() else {
            return Err(InvalidRequest::MissingValue {
                field: field.id.clone(),
                operator,
            }
            .into());
        };

        let predicate = match operator {
            FilterOperator::Equal => Predicate::Equal(first),
            FilterOperator::NotEqual => Predicate::NotEqual(first),
            FilterOperator::In => Predicate::In(values),
            FilterOperator::NotIn => Predicate::NotIn(values),
            FilterOperator::Like => Predicate::Like(like_pattern(&first)),
            FilterOperator::NotLike => Predicate::NotLike(like_pattern(&first)),
            other => match Comparison::from_operator(other) {
                Some(comparison) => Predicate::Compare(comparison, Bound::from_value(&first)),
                None => unreachable!("{other} takes no value"),
            },
        };
        Ok(predicate)
    }

    fn coerce(&self, field: &SearchField, raw: &str) -> Result<Value> {
        self.coercion
            .coerce(field.field_type, raw)
            .map_err(|source| SearchError::Conversion {
                field: field.id.clone(),
                value: raw.to_string(),
                source,
            })
    }
}

fn like_pattern(value: &Value) -> String {
    format!("%{}%", value.to_string().to_lowercase())
}

/// Resolves a field's path against the plan's traversal nodes.
fn resolve(joins: &mut Joins, field: &SearchField, required: bool) -> Target {
    let segments: Vec<&str> = field.segments().collect();

    if field.element_collection {
        if let Some(join) = joins.resolve(&segments, required) {
            return Target::Element { join };
        }
    }

    match segments.split_last() {
        Some((name, hops)) => Target::Attribute {
            join: joins.resolve(hops, required),
            name: (*name).to_string(),
        },
        None => Target::Attribute {
            join: None,
            name: field.path.clone(),
        },
    }
}

fn log_plan(plan: &QueryPlan) {
    debug!(
        record = %plan.record,
        projection = ?plan.projection,
        conditions = plan.conditions.len(),
        orderings = plan.orderings.len(),
        joins = plan.joins.len(),
        distinct = plan.distinct,
        skip = plan.skip,
        take = ?plan.take,
        "built query plan"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::CapabilityTable;
    use crate::value::{EnumType, FieldType};

    const STATUS: EnumType = EnumType::new("OrderStatus", &["OPEN", "SHIPPED"]);

    fn catalogue() -> Catalogue {
        Catalogue::new(
            "Customer",
            vec![
                SearchField::simple("name", FieldType::String),
                SearchField::simple("age", FieldType::I32),
                SearchField::new("addressCity", "address.city", FieldType::String),
                SearchField::new("ordersTotal", "orders.total", FieldType::Decimal)
                    .multi_valued(),
                SearchField::new("ordersStatus", "orders.status", FieldType::Enum(STATUS))
                    .multi_valued(),
                SearchField::simple("tags", FieldType::String).element_collection(),
            ],
            &CapabilityTable::standard(),
        )
        .unwrap()
    }

    fn page_plan(request: &SearchRequest) -> Result<QueryPlan> {
        let catalogue = catalogue();
        let coercion = CoercionRegistry::standard();
        PlanBuilder::new(&catalogue, &coercion).page_plan(request)
    }

    #[test]
    fn plain_filters_are_not_distinct() {
        let plan = page_plan(
            &SearchRequest::new(1, 10).filter("age", FilterOperator::GreaterThan, ["18"]),
        )
        .unwrap();
        assert!(!plan.distinct);
        assert!(plan.joins.is_empty());
        assert_eq!(
            plan.conditions[0].predicate,
            Predicate::Compare(Comparison::GreaterThan, Bound::Int(18))
        );
        assert_eq!(
            plan.conditions[0].target,
            Target::Attribute {
                join: None,
                name: "age".into()
            }
        );
    }

    #[test]
    fn shared_prefix_joins_once() {
        let plan = page_plan(
            &SearchRequest::new(1, 10)
                .filter_eq("ordersStatus", "open")
                .filter("ordersTotal", FilterOperator::GreaterThan, ["100.00"]),
        )
        .unwrap();
        assert_eq!(plan.joins.len(), 1);
        let orders = plan.joins.find("orders").unwrap();
        assert_eq!(plan.conditions_on(orders).count(), 2);
        assert!(plan.distinct);
        assert_eq!(
            plan.conditions[0].predicate,
            Predicate::Equal(Value::Enum(STATUS.member("OPEN").unwrap()))
        );
    }

    #[test]
    fn sort_only_joins_are_optional() {
        let plan = page_plan(&SearchRequest::new(1, 10).sort_asc("addressCity")).unwrap();
        let address = plan.joins.find("address").unwrap();
        assert!(!plan.joins.get(address).unwrap().required);

        let plan = page_plan(
            &SearchRequest::new(1, 10)
                .sort_asc("addressCity")
                .filter_not_null("addressCity"),
        )
        .unwrap();
        assert!(plan.joins.get(address).unwrap().required);
        assert_eq!(plan.joins.len(), 1);
    }

    #[test]
    fn element_collections_target_the_element() {
        let plan = page_plan(&SearchRequest::new(1, 10).filter_eq("tags", "vip")).unwrap();
        let tags = plan.joins.find("tags").unwrap();
        assert_eq!(plan.conditions[0].target, Target::Element { join: tags });
        assert!(plan.distinct);
    }

    #[test]
    fn like_wraps_lowercased_value() {
        let plan = page_plan(
            &SearchRequest::new(1, 10).filter("name", FilterOperator::NotLike, ["Ann"]),
        )
        .unwrap();
        assert_eq!(plan.conditions[0].predicate, Predicate::NotLike("%ann%".into()));
    }

    #[test]
    fn in_keeps_every_value() {
        let plan = page_plan(
            &SearchRequest::new(1, 10).filter("age", FilterOperator::In, ["1", "2", "3"]),
        )
        .unwrap();
        assert_eq!(
            plan.conditions[0].predicate,
            Predicate::In(vec![Value::I32(1), Value::I32(2), Value::I32(3)])
        );
    }

    #[test]
    fn conversion_failure_names_field_and_value() {
        let err = page_plan(&SearchRequest::new(1, 10).filter_eq("ordersStatus", "bogus"))
            .unwrap_err();
        assert!(err.is_conversion());
        let message = err.to_string();
        assert!(message.contains("ordersStatus"));
        assert!(message.contains("bogus"));
    }

    #[test]
    fn pagination() {
        let plan = page_plan(&SearchRequest::new(3, 20)).unwrap();
        assert_eq!(plan.skip, 40);
        assert_eq!(plan.take, Some(20));
    }

    #[test]
    fn count_plan_drops_sorts_and_paging() {
        let catalogue = catalogue();
        let coercion = CoercionRegistry::standard();
        let request = SearchRequest::new(2, 10)
            .filter("ordersTotal", FilterOperator::GreaterThan, ["5"])
            .sort_asc("name");
        let plan = PlanBuilder::new(&catalogue, &coercion)
            .count_plan(&request)
            .unwrap();
        assert!(plan.is_count());
        assert!(plan.orderings.is_empty());
        assert!(plan.distinct);
        assert_eq!(plan.skip, 0);
        assert_eq!(plan.take, None);
        assert_eq!(plan.joins.len(), 1);
    }

    #[test]
    fn display_reads_like_a_query() {
        let plan = page_plan(
            &SearchRequest::new(1, 10)
                .filter("ordersTotal", FilterOperator::GreaterThan, ["100.00"])
                .sort_desc("age"),
        )
        .unwrap();
        assert_eq!(
            plan.to_string(),
            "SELECT DISTINCT root FROM Customer root JOIN root.orders j0 \
             WHERE j0.total > 100.00 ORDER BY root.age DESC OFFSET 0 LIMIT 10"
        );
    }

    #[test]
    #[should_panic(expected = "comparison bound must be numeric or temporal")]
    fn unordered_bound_panics() {
        Bound::from_value(&Value::from("text"));
    }

    #[test]
    fn comparison_matches() {
        use std::cmp::Ordering::*;
        assert!(Comparison::GreaterThan.matches(Greater));
        assert!(!Comparison::GreaterThan.matches(Equal));
        assert!(Comparison::GreaterThanOrEqual.matches(Equal));
        assert!(Comparison::LessThanOrEqual.matches(Less));
        assert!(!Comparison::LessThan.matches(Equal));
    }
}
