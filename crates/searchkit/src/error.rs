//! Error types for the searchkit crate.

use thiserror::Error;

use crate::op::{FilterOperator, OperatorSet};
use crate::value::TypeKind;

/// Errors surfaced by discovery, validation, coercion, and execution.
///
/// Every variant is reported before any query executes; there is no partial
/// result.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request is malformed with respect to the catalogue or the
    /// configured limits.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),

    /// A raw filter value could not be coerced to its field's type.
    #[error("unable to convert search field '{field}' with value '{value}': {source}")]
    Conversion {
        field: String,
        value: String,
        #[source]
        source: CoercionError,
    },

    /// A record's registration cannot be turned into a catalogue, or the
    /// engine configuration is invalid.
    #[error("configuration error in {record}: {message}")]
    Configuration { record: String, message: String },

    /// The engine configuration file could not be read.
    #[error("failed to read engine configuration from {}: {source}", .path.display())]
    ConfigRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine configuration could not be parsed.
    #[error("failed to parse engine configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The query executor failed.
    #[error("query execution failed: {0}")]
    Executor(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SearchError {
    pub(crate) fn configuration(record: impl Into<String>, message: impl Into<String>) -> Self {
        SearchError::Configuration {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Wraps an executor failure.
    pub fn executor<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SearchError::Executor(Box::new(err))
    }

    /// Returns the request problem, if this is an invalid-request error.
    pub fn as_invalid_request(&self) -> Option<&InvalidRequest> {
        match self {
            SearchError::InvalidRequest(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns `true` if this is a conversion error.
    pub fn is_conversion(&self) -> bool {
        matches!(self, SearchError::Conversion { .. })
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SearchError::Configuration { .. }
                | SearchError::ConfigRead { .. }
                | SearchError::ConfigParse(_)
        )
    }
}

/// Reasons a search request is rejected by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("page must be at least 1, got {page}")]
    PageOutOfRange { page: u32 },

    #[error("page size must be at least 1")]
    EmptyPage,

    #[error("the search request is limited to {max} results, got {requested}")]
    PageSizeExceeded { requested: u32, max: u32 },

    #[error("search field '{field}' was not found, known fields: [{}]", .known.join(", "))]
    UnknownField { field: String, known: Vec<String> },

    #[error("filter '{operator}' is not allowed for field '{field}', available filters: {allowed}")]
    OperatorNotAllowed {
        field: String,
        operator: FilterOperator,
        allowed: OperatorSet,
    },

    #[error("filter '{operator}' requires a value, invalid field: '{field}'")]
    MissingValue {
        field: String,
        operator: FilterOperator,
    },

    #[error("sorting by fields in joined collections is not allowed, invalid field: '{field}'")]
    SortOnCollection { field: String },
}

/// Failures of the type coercion registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("invalid integer: {0}")]
    Integer(#[from] std::num::ParseIntError),

    #[error("invalid floating point number: {0}")]
    Float(#[from] std::num::ParseFloatError),

    #[error("invalid decimal: {0}")]
    Decimal(String),

    #[error("invalid boolean '{0}', expected true or false")]
    Boolean(String),

    #[error("invalid uuid: {0}")]
    Uuid(String),

    #[error("invalid currency code '{0}', expected three ASCII letters")]
    Currency(String),

    #[error("no constant {value} in enum {enum_name}, expected one of: {}", .members.join(", "))]
    UnknownMember {
        enum_name: &'static str,
        value: String,
        members: &'static [&'static str],
    },

    #[error("no conversion registered for {0} values")]
    Unsupported(TypeKind),

    #[error("conversion for {expected} values produced a {got} value")]
    WrongKind { expected: TypeKind, got: TypeKind },
}

impl From<rust_decimal::Error> for CoercionError {
    fn from(err: rust_decimal::Error) -> Self {
        CoercionError::Decimal(err.to_string())
    }
}

impl From<uuid::Error> for CoercionError {
    fn from(err: uuid::Error) -> Self {
        CoercionError::Uuid(err.to_string())
    }
}

/// Result type for searchkit operations.
pub type Result<T> = std::result::Result<T, SearchError>;
