//! Filter operators and the capability table.
//!
//! [`FilterOperator`] is the closed set of operators a request may use.
//! [`CapabilityTable`] decides which operators apply to which semantic
//! types; it is built once and consulted by both the validator and the plan
//! builder.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::TypeKind;

/// Comparison operator for a filter.
///
/// Operators are grouped by the types they support:
/// - **Common**: `Equal`, `NotEqual`, `In`, `NotIn`, `IsNull`, `IsNotNull`
/// - **String**: `Like`, `NotLike`
/// - **Ordered** (numeric and temporal): `GreaterThan`, `GreaterThanOrEqual`,
///   `LessThan`, `LessThanOrEqual`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    IsNull,
    IsNotNull,
    Equal,
    NotEqual,
    In,
    NotIn,
    Like,
    NotLike,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 12] = [
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
        FilterOperator::Equal,
        FilterOperator::NotEqual,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::Like,
        FilterOperator::NotLike,
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::GreaterThanOrEqual,
        FilterOperator::LessThanOrEqual,
    ];

    /// Returns `false` only for the null checks.
    pub fn requires_value(self) -> bool {
        !matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }

    /// Returns `true` for the four ordered comparisons.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            FilterOperator::GreaterThan
                | FilterOperator::LessThan
                | FilterOperator::GreaterThanOrEqual
                | FilterOperator::LessThanOrEqual
        )
    }

    /// Returns the display name of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::IsNull => "IS_NULL",
            FilterOperator::IsNotNull => "IS_NOT_NULL",
            FilterOperator::Equal => "EQUAL",
            FilterOperator::NotEqual => "NOT_EQUAL",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOT_IN",
            FilterOperator::Like => "LIKE",
            FilterOperator::NotLike => "NOT_LIKE",
            FilterOperator::GreaterThan => "GREATER_THAN",
            FilterOperator::LessThan => "LESS_THAN",
            FilterOperator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            FilterOperator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        }
    }

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of filter operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OperatorSet(u16);

impl OperatorSet {
    pub const EMPTY: OperatorSet = OperatorSet(0);

    /// Operators valid for every supported type.
    pub const COMMON: OperatorSet = OperatorSet::from_slice(&[
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
        FilterOperator::Equal,
        FilterOperator::NotEqual,
        FilterOperator::In,
        FilterOperator::NotIn,
    ]);

    /// Substring operators.
    pub const LIKE: OperatorSet =
        OperatorSet::from_slice(&[FilterOperator::Like, FilterOperator::NotLike]);

    /// Ordered comparisons.
    pub const COMPARISON: OperatorSet = OperatorSet::from_slice(&[
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::GreaterThanOrEqual,
        FilterOperator::LessThanOrEqual,
    ]);

    pub const fn from_slice(ops: &[FilterOperator]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < ops.len() {
            bits |= ops[i].bit();
            i += 1;
        }
        OperatorSet(bits)
    }

    pub const fn union(self, other: OperatorSet) -> Self {
        OperatorSet(self.0 | other.0)
    }

    pub const fn intersection(self, other: OperatorSet) -> Self {
        OperatorSet(self.0 & other.0)
    }

    pub const fn contains(self, op: FilterOperator) -> bool {
        self.0 & op.bit() != 0
    }

    pub const fn is_subset(self, other: OperatorSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, op: FilterOperator) {
        self.0 |= op.bit();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates in declaration order.
    pub fn iter(self) -> impl Iterator<Item = FilterOperator> {
        FilterOperator::ALL
            .into_iter()
            .filter(move |op| self.contains(*op))
    }
}

impl FromIterator<FilterOperator> for OperatorSet {
    fn from_iter<I: IntoIterator<Item = FilterOperator>>(iter: I) -> Self {
        let mut set = OperatorSet::EMPTY;
        for op in iter {
            set.insert(op);
        }
        set
    }
}

impl fmt::Debug for OperatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for OperatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, op) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(op.as_str())?;
        }
        f.write_str("]")
    }
}

/// Immutable operator → supported-types table.
///
/// Construct once with [`CapabilityTable::standard`] and share it; it does
/// not vary per request.
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    by_kind: [OperatorSet; TypeKind::ALL.len()],
}

impl CapabilityTable {
    /// The standard table: common operators for every type, `LIKE` for
    /// strings, comparisons for numeric and temporal types.
    pub fn standard() -> Self {
        let mut by_kind = [OperatorSet::COMMON; TypeKind::ALL.len()];
        for kind in TypeKind::ALL {
            let slot = &mut by_kind[kind as usize];
            if kind == TypeKind::String {
                *slot = slot.union(OperatorSet::LIKE);
            }
            if kind.is_ordered() {
                *slot = slot.union(OperatorSet::COMPARISON);
            }
        }
        CapabilityTable { by_kind }
    }

    /// All operators applicable to `kind`.
    pub fn operators_for(&self, kind: TypeKind) -> OperatorSet {
        self.by_kind[kind as usize]
    }

    /// The types `op` may be applied to.
    pub fn supported_types(&self, op: FilterOperator) -> Vec<TypeKind> {
        TypeKind::ALL
            .into_iter()
            .filter(|kind| self.supports(op, *kind))
            .collect()
    }

    pub fn supports(&self, op: FilterOperator, kind: TypeKind) -> bool {
        self.operators_for(kind).contains(op)
    }

    /// Operators a field may use: the table's set for its type, narrowed by
    /// the field's own restriction when it declares one.
    pub fn allowed(&self, kind: TypeKind, restriction: Option<OperatorSet>) -> OperatorSet {
        let supported = self.operators_for(kind);
        match restriction {
            Some(restricted) => supported.intersection(restricted),
            None => supported,
        }
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        CapabilityTable::standard()
    }
}
