//! In-memory query execution.
//!
//! [`MemoryExecutor`] runs a [`QueryPlan`] over a slice of records, with
//! the semantics a relational backend would give the same plan:
//!
//! - every traversal node binds one related record (or element) at a time,
//!   so conditions through the same node must hold for the same related
//!   record;
//! - required nodes drop root records with nothing to bind, optional nodes
//!   bind null;
//! - without `distinct`, a root record appears once per satisfying binding;
//! - orderings sort nulls last, and ties keep slice order.

use std::cmp::Ordering;

use regex::Regex;
use thiserror::Error;

use crate::executor::QueryExecutor;
use crate::plan::{JoinId, JoinNode, OrderClause, Predicate, QueryPlan, Target};
use crate::schema::{Record, Slot};
use crate::value::{compare_values, Value};

/// Failures of the in-memory executor.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("invalid like pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("plan references unknown traversal node {0}")]
    UnknownJoin(JoinId),
}

/// Executes plans over borrowed records.
///
/// ```
/// use searchkit::{MemoryExecutor, QueryExecutor, Record, Slot, Value};
/// # use searchkit::{Catalogue, CapabilityTable, CoercionRegistry, FieldType,
/// #     PlanBuilder, SearchField, SearchRequest, FilterOperator};
///
/// struct Item { price: i64 }
///
/// impl Record for Item {
///     fn slot(&self, attribute: &str) -> Slot<'_> {
///         match attribute {
///             "price" => Slot::Value(Some(Value::I64(self.price))),
///             _ => Slot::Missing,
///         }
///     }
/// }
///
/// # let catalogue = Catalogue::new("Item", vec![SearchField::simple("price", FieldType::I64)],
/// #     &CapabilityTable::standard()).unwrap();
/// # let coercion = CoercionRegistry::standard();
/// # let request = SearchRequest::new(1, 10).filter("price", FilterOperator::LessThan, ["10"]);
/// # let plan = PlanBuilder::new(&catalogue, &coercion).page_plan(&request).unwrap();
/// let items = [Item { price: 5 }, Item { price: 50 }];
/// let rows = MemoryExecutor::new(&items).fetch(&plan).unwrap();
/// assert_eq!(rows.len(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryExecutor<'a, T> {
    rows: &'a [T],
}

impl<T> Clone for MemoryExecutor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MemoryExecutor<'_, T> {}

impl<'a, T: Record> MemoryExecutor<'a, T> {
    pub fn new(rows: &'a [T]) -> Self {
        MemoryExecutor { rows }
    }

    pub fn rows(&self) -> &'a [T] {
        self.rows
    }

    /// Every `(row, sort keys)` pair the plan selects, before ordering and
    /// pagination.
    fn select(&self, plan: &QueryPlan) -> Result<Vec<(&'a T, Vec<Option<Value>>)>, MemoryError> {
        let compiled = Compiled::new(plan)?;
        let mut hits = Vec::new();

        for row in self.rows {
            let mut matches = Vec::new();
            compiled.walk(row, &mut Vec::new(), &mut matches);
            if plan.distinct {
                if let Some(keys) = matches.into_iter().next() {
                    hits.push((row, keys));
                }
            } else {
                hits.extend(matches.into_iter().map(|keys| (row, keys)));
            }
        }

        Ok(hits)
    }
}

impl<'a, T: Record + 'static> QueryExecutor for MemoryExecutor<'a, T> {
    type Root = T;
    type Row = &'a T;
    type Error = MemoryError;

    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<&'a T>, MemoryError> {
        let mut hits = self.select(plan)?;
        if !plan.orderings.is_empty() {
            hits.sort_by(|(_, a), (_, b)| compare_keys(&plan.orderings, a, b));
        }

        let skip = usize::try_from(plan.skip).unwrap_or(usize::MAX);
        let take = plan
            .take
            .map_or(usize::MAX, |take| usize::try_from(take).unwrap_or(usize::MAX));

        Ok(hits
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(row, _)| row)
            .collect())
    }

    fn count(&self, plan: &QueryPlan) -> Result<u64, MemoryError> {
        Ok(self.select(plan)?.len() as u64)
    }
}

/// What a traversal node is bound to.
#[derive(Clone)]
enum Node<'r> {
    Record(&'r dyn Record),
    Element(Value),
    Absent,
}

/// A plan with its like-patterns compiled.
struct Compiled<'p> {
    plan: &'p QueryPlan,
    nodes: Vec<&'p JoinNode>,
    patterns: Vec<Option<Regex>>,
}

impl<'p> Compiled<'p> {
    fn new(plan: &'p QueryPlan) -> Result<Self, MemoryError> {
        let nodes: Vec<&JoinNode> = plan.joins.iter().map(|(_, node)| node).collect();

        let targets = plan
            .conditions
            .iter()
            .map(|c| &c.target)
            .chain(plan.orderings.iter().map(|o| &o.target));
        for target in targets {
            let join = match target {
                Target::Attribute { join, .. } => *join,
                Target::Element { join } => Some(*join),
            };
            if let Some(join) = join.filter(|j| j.index() >= nodes.len()) {
                return Err(MemoryError::UnknownJoin(join));
            }
        }

        let patterns: Vec<Option<Regex>> = plan
            .conditions
            .iter()
            .map(|condition| match &condition.predicate {
                Predicate::Like(pattern) | Predicate::NotLike(pattern) => {
                    like_regex(pattern).map(Some)
                }
                _ => Ok(None),
            })
            .collect::<Result<_, _>>()?;

        Ok(Compiled {
            plan,
            nodes,
            patterns,
        })
    }

    /// Enumerates bindings depth-first, pushing the sort keys of every
    /// binding that satisfies all conditions.
    fn walk<'r>(
        &self,
        root: &'r dyn Record,
        bound: &mut Vec<Node<'r>>,
        out: &mut Vec<Vec<Option<Value>>>,
    ) {
        let Some(node) = self.nodes.get(bound.len()) else {
            if self.satisfied(root, bound) {
                out.push(
                    self.plan
                        .orderings
                        .iter()
                        .map(|order| read(&order.target, root, bound))
                        .collect(),
                );
            }
            return;
        };

        let source = match node.parent {
            None => Some(root),
            Some(parent) => match bound.get(parent.index()) {
                Some(Node::Record(record)) => Some(*record),
                _ => None,
            },
        };
        let candidates = source.map_or_else(Vec::new, |record| candidates(record.slot(&node.attribute)));

        if candidates.is_empty() {
            if !node.required {
                bound.push(Node::Absent);
                self.walk(root, bound, out);
                bound.pop();
            }
            return;
        }

        for candidate in candidates {
            bound.push(candidate);
            self.walk(root, bound, out);
            bound.pop();
            if self.plan.distinct && !out.is_empty() {
                return;
            }
        }
    }

    fn satisfied(&self, root: &dyn Record, bound: &[Node<'_>]) -> bool {
        self.plan
            .conditions
            .iter()
            .zip(&self.patterns)
            .all(|(condition, pattern)| {
                let value = read(&condition.target, root, bound);
                test(&condition.predicate, pattern.as_ref(), value.as_ref())
            })
    }
}

fn candidates(slot: Slot<'_>) -> Vec<Node<'_>> {
    match slot {
        Slot::One(Some(record)) => vec![Node::Record(record)],
        Slot::Many(records) => records.into_iter().map(Node::Record).collect(),
        Slot::Values(values) => values.into_iter().map(Node::Element).collect(),
        Slot::One(None) | Slot::Value(_) | Slot::Missing => Vec::new(),
    }
}

fn read(target: &Target, root: &dyn Record, bound: &[Node<'_>]) -> Option<Value> {
    match target {
        Target::Attribute { join: None, name } => scalar(root.slot(name)),
        Target::Attribute {
            join: Some(join),
            name,
        } => match bound.get(join.index()) {
            Some(Node::Record(record)) => scalar(record.slot(name)),
            _ => None,
        },
        Target::Element { join } => match bound.get(join.index()) {
            Some(Node::Element(value)) => Some(value.clone()),
            _ => None,
        },
    }
}

fn scalar(slot: Slot<'_>) -> Option<Value> {
    match slot {
        Slot::Value(value) => value,
        _ => None,
    }
}

/// Null never satisfies anything but `IS NULL`.
fn test(predicate: &Predicate, pattern: Option<&Regex>, value: Option<&Value>) -> bool {
    let Some(value) = value else {
        return matches!(predicate, Predicate::IsNull);
    };

    match predicate {
        Predicate::IsNull => false,
        Predicate::IsNotNull => true,
        Predicate::Equal(expected) => equal(value, expected),
        Predicate::NotEqual(expected) => !equal(value, expected),
        Predicate::In(options) => options.iter().any(|o| equal(value, o)),
        Predicate::NotIn(options) => !options.iter().any(|o| equal(value, o)),
        Predicate::Like(_) => pattern.is_some_and(|p| p.is_match(&value.to_string())),
        Predicate::NotLike(_) => pattern.is_some_and(|p| !p.is_match(&value.to_string())),
        Predicate::Compare(comparison, bound) => compare_values(value, &bound.to_value())
            .is_some_and(|ordering| comparison.matches(ordering)),
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}

/// Translates a SQL `LIKE` pattern (`%` and `_` wildcards) into an anchored,
/// case-insensitive regex.
fn like_regex(pattern: &str) -> Result<Regex, MemoryError> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?is)^");
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    Regex::new(&source).map_err(|source| MemoryError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn compare_keys(orderings: &[OrderClause], a: &[Option<Value>], b: &[Option<Value>]) -> Ordering {
    for ((order, a), b) in orderings.iter().zip(a).zip(b) {
        let ordering = match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => order
                .direction
                .apply(compare_values(a, b).unwrap_or(Ordering::Equal)),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
