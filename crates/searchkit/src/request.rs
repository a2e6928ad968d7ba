//! Search request and response types.
//!
//! Both sides (de)serialize with serde using camelCase keys, so a request
//! can be read straight from a JSON body:
//!
//! ```
//! use searchkit::{FilterOperator, SearchRequest};
//!
//! let request: SearchRequest = serde_json::from_str(r#"{
//!     "page": 1,
//!     "pageSize": 10,
//!     "filters": [{ "field": "age", "operator": "GREATER_THAN", "value": ["18"] }]
//! }"#).unwrap();
//!
//! assert_eq!(request.filters[0].operator, FilterOperator::GreaterThan);
//! assert!(request.sorts.is_empty());
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::op::FilterOperator;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Ascending order (smallest first).
    #[default]
    #[serde(alias = "asc")]
    Asc,
    /// Descending order (largest first).
    #[serde(alias = "desc")]
    Desc,
}

impl Direction {
    pub fn is_asc(self) -> bool {
        matches!(self, Direction::Asc)
    }

    /// Applies this direction to an ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter: a catalogue id, an operator, and raw string values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    /// Raw values, coerced to the field's type during planning. Empty for the
    /// null checks.
    #[serde(default, alias = "value")]
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<I, S>(field: impl Into<String>, operator: FilterOperator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter {
            field: field.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// A filter without values, for the null checks.
    pub fn unary(field: impl Into<String>, operator: FilterOperator) -> Self {
        Filter {
            field: field.into(),
            operator,
            values: Vec::new(),
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// A page of filtered, sorted results to fetch.
///
/// Filters are conjoined; sorts apply in order. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub page: u32,
    #[serde(alias = "size")]
    pub page_size: u32,
    #[serde(default)]
    pub sorts: Vec<Sort>,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl SearchRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        SearchRequest {
            page,
            page_size,
            sorts: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Adds a filter.
    pub fn filter<I, S>(mut self, field: &str, operator: FilterOperator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.push(Filter::new(field, operator, values));
        self
    }

    /// Adds an `EQUAL` filter.
    pub fn filter_eq(self, field: &str, value: impl Into<String>) -> Self {
        self.filter(field, FilterOperator::Equal, [value])
    }

    /// Adds an `IS_NULL` filter.
    pub fn filter_null(mut self, field: &str) -> Self {
        self.filters.push(Filter::unary(field, FilterOperator::IsNull));
        self
    }

    /// Adds an `IS_NOT_NULL` filter.
    pub fn filter_not_null(mut self, field: &str) -> Self {
        self.filters.push(Filter::unary(field, FilterOperator::IsNotNull));
        self
    }

    pub fn sort(mut self, field: &str, direction: Direction) -> Self {
        self.sorts.push(Sort {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn sort_asc(self, field: &str) -> Self {
        self.sort(field, Direction::Asc)
    }

    pub fn sort_desc(self, field: &str) -> Self {
        self.sort(field, Direction::Desc)
    }

    /// Rows to skip for this page: `(page - 1) * page_size`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest::new(1, 20)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse<T> {
    pub page: u32,
    pub page_size: u32,
    /// Number of rows in `data`.
    pub returned_count: u64,
    /// Rows matching the filters across all pages; absent when totals were
    /// not requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    pub data: Vec<T>,
}

impl<T> SearchResponse<T> {
    /// Assembles a response for `request` from fetched rows.
    pub fn new(request: &SearchRequest, data: Vec<T>, total_count: Option<u64>) -> Self {
        SearchResponse {
            page: request.page,
            page_size: request.page_size,
            returned_count: data.len() as u64,
            total_count,
            data,
        }
    }

    /// Transforms every row, keeping order and counts.
    pub fn map<U, F>(self, f: F) -> SearchResponse<U>
    where
        F: FnMut(T) -> U,
    {
        SearchResponse {
            page: self.page,
            page_size: self.page_size,
            returned_count: self.returned_count,
            total_count: self.total_count,
            data: self.data.into_iter().map(f).collect(),
        }
    }

    /// Number of pages needed for `total_count`, when known.
    pub fn total_pages(&self) -> Option<u64> {
        let size = u64::from(self.page_size.max(1));
        self.total_count.map(|total| total.div_ceil(size))
    }
}
