//! Searchkit - declarative paged search over statically-typed records.
//!
//! A caller describes a page of filtered, sorted results with a generic
//! [`SearchRequest`]; searchkit turns it into a backend-neutral
//! [`QueryPlan`] without any per-record query code. It provides:
//!
//! - Field discovery: a record's searchable attributes, including those
//!   reached through related records, flattened into a [`Catalogue`] of
//!   addressable [`SearchField`]s and memoized per type
//! - Request validation against the catalogue and the engine limits
//! - Query planning: traversal nodes shared per path prefix, typed
//!   conditions, orderings, the distinct flag, and pagination
//! - Response assembly, with or without totals
//!
//! Storage is not part of the crate. A [`QueryExecutor`] runs plans; the
//! bundled [`MemoryExecutor`] runs them over in-process slices.
//!
//! # Quick Start
//!
//! ```rust
//! use searchkit::{FilterOperator, MemoryExecutor, SearchEngine, SearchRequest, Searchable};
//!
//! #[derive(Searchable)]
//! struct Order {
//!     #[search]
//!     total: i64,
//! }
//!
//! #[derive(Searchable)]
//! struct Customer {
//!     #[search]
//!     name: String,
//!     #[search]
//!     age: i32,
//!     #[search(many)]
//!     orders: Vec<Order>,
//! }
//!
//! let customers = vec![
//!     Customer { name: "Ann".into(), age: 34, orders: vec![Order { total: 250 }] },
//!     Customer { name: "Bob".into(), age: 17, orders: vec![Order { total: 900 }] },
//!     Customer { name: "Cid".into(), age: 52, orders: vec![] },
//! ];
//!
//! let request = SearchRequest::new(1, 10)
//!     .filter("age", FilterOperator::GreaterThan, ["18"])
//!     .filter("ordersTotal", FilterOperator::GreaterThan, ["100"]);
//!
//! let engine = SearchEngine::new();
//! let page = engine.search(&request, &MemoryExecutor::new(&customers)).unwrap();
//!
//! assert_eq!(page.total_count, Some(1));
//! assert_eq!(page.data[0].name, "Ann");
//! ```
//!
//! # Operators
//!
//! | Types | Operators |
//! |-------|-----------|
//! | all | `EQUAL`, `NOT_EQUAL`, `IN`, `NOT_IN`, `IS_NULL`, `IS_NOT_NULL` |
//! | string | `LIKE`, `NOT_LIKE` |
//! | integers, floats, decimal, instant | `GREATER_THAN`, `GREATER_THAN_OR_EQUAL`, `LESS_THAN`, `LESS_THAN_OR_EQUAL` |
//!
//! # Distinct Results
//!
//! A field reached through a to-many relationship or an element collection
//! can match several times for one root record. Filtering on such a field
//! marks the plan `distinct`, and sorting on it is rejected.

mod coerce;
mod config;
mod discover;
mod engine;
mod error;
mod executor;
mod field;
mod memory;
mod naming;
mod op;
mod plan;
mod request;
mod schema;
mod validate;
mod value;

// Re-export public API
pub use coerce::{CoerceFn, CoercionRegistry};
pub use config::EngineConfig;
pub use discover::FieldDiscoverer;
pub use engine::{SearchEngine, SearchEngineBuilder};
pub use error::{CoercionError, InvalidRequest, Result, SearchError};
pub use executor::QueryExecutor;
pub use field::{Catalogue, SearchField};
pub use memory::{MemoryError, MemoryExecutor};
pub use naming::NamingConvention;
pub use op::{CapabilityTable, FilterOperator, OperatorSet};
pub use plan::{
    Bound, Comparison, Condition, JoinId, JoinNode, Joins, OrderClause, PlanBuilder, Predicate,
    Projection, QueryPlan, Target,
};
pub use request::{Direction, Filter, SearchRequest, SearchResponse, Sort};
pub use schema::{
    Attribute, AttributeKind, Record, RecordType, Relation, SearchElements, SearchEnum,
    SearchScalar, Searchable, Slot,
};
pub use validate::RequestValidator;
pub use value::{
    compare_values, CurrencyCode, EnumType, EnumValue, FieldType, FloatWidth, IntWidth, Timestamp,
    TypeKind, Value,
};

#[cfg(feature = "derive")]
pub use searchkit_macros::{Searchable, SearchableEnum};
