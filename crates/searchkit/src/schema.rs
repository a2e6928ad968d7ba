//! Static registration of searchable records.
//!
//! A record type describes its searchable attributes through the
//! [`Searchable`] trait, usually derived with `#[derive(Searchable)]`. The
//! discoverer walks these descriptions; nothing is inspected at runtime.
//!
//! # Manual Implementation
//!
//! ```
//! use searchkit::{Attribute, FieldType, Searchable};
//!
//! struct Order;
//! struct Customer;
//!
//! impl Searchable for Order {
//!     fn search_attributes() -> Vec<Attribute> {
//!         vec![Attribute::scalar("total", FieldType::Decimal)]
//!     }
//! }
//!
//! impl Searchable for Customer {
//!     fn search_attributes() -> Vec<Attribute> {
//!         vec![
//!             Attribute::scalar("name", FieldType::String),
//!             Attribute::to_many::<Order>("orders"),
//!         ]
//!     }
//! }
//! ```

use std::any::TypeId;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::op::OperatorSet;
use crate::value::{CurrencyCode, EnumType, FieldType, Timestamp, Value};

/// A record type that can be searched.
pub trait Searchable: 'static {
    /// Name used in logs and configuration errors.
    fn record_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// The searchable attributes, in declaration order.
    fn search_attributes() -> Vec<Attribute>;
}

/// Handle to a [`Searchable`] type, usable as a cache key.
#[derive(Clone, Copy)]
pub struct RecordType {
    id: TypeId,
    name: &'static str,
    attributes: fn() -> Vec<Attribute>,
}

impl RecordType {
    pub fn of<T: Searchable>() -> Self {
        RecordType {
            id: TypeId::of::<T>(),
            name: T::record_name(),
            attributes: T::search_attributes,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Asks the record for its attributes.
    pub fn attributes(&self) -> Vec<Attribute> {
        (self.attributes)()
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordType {}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How an attribute relates to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// A directly supported value.
    Scalar(FieldType),
    /// A collection of directly supported values.
    Elements(FieldType),
    /// A single related record.
    ToOne(RecordType),
    /// A collection of related records.
    ToMany(RecordType),
    /// A base record whose attributes belong to this record.
    Flatten(RecordType),
    /// Marked searchable but of a type the engine cannot classify.
    Unsupported(&'static str),
}

/// One searchable attribute of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute's own name; the last segment of its path.
    pub name: &'static str,
    /// Explicit id, bypassing the naming convention.
    pub id: Option<&'static str>,
    /// Operator restriction for the emitted field(s).
    pub operators: Option<OperatorSet>,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn new(name: &'static str, kind: AttributeKind) -> Self {
        Attribute {
            name,
            id: None,
            operators: None,
            kind,
        }
    }

    pub fn scalar(name: &'static str, field_type: FieldType) -> Self {
        Attribute::new(name, AttributeKind::Scalar(field_type))
    }

    pub fn elements(name: &'static str, field_type: FieldType) -> Self {
        Attribute::new(name, AttributeKind::Elements(field_type))
    }

    pub fn to_one<T: Searchable>(name: &'static str) -> Self {
        Attribute::new(name, AttributeKind::ToOne(RecordType::of::<T>()))
    }

    pub fn to_many<T: Searchable>(name: &'static str) -> Self {
        Attribute::new(name, AttributeKind::ToMany(RecordType::of::<T>()))
    }

    pub fn flatten<T: Searchable>(name: &'static str) -> Self {
        Attribute::new(name, AttributeKind::Flatten(RecordType::of::<T>()))
    }

    pub fn unsupported(name: &'static str, type_name: &'static str) -> Self {
        Attribute::new(name, AttributeKind::Unsupported(type_name))
    }

    /// Overrides the generated id.
    pub fn rename(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn operators(mut self, operators: OperatorSet) -> Self {
        self.operators = Some(operators);
        self
    }
}

// ============================================================================
// Record access
// ============================================================================

/// Runtime access to a record's attributes, used by the in-memory executor.
///
/// Generated by `#[derive(Searchable)]` alongside [`Searchable`].
pub trait Record {
    fn slot(&self, attribute: &str) -> Slot<'_>;
}

/// The value behind one attribute of a record.
pub enum Slot<'a> {
    /// A scalar; `None` when null.
    Value(Option<Value>),
    /// An element collection.
    Values(Vec<Value>),
    /// A to-one relationship; `None` when absent.
    One(Option<&'a dyn Record>),
    /// A to-many relationship.
    Many(Vec<&'a dyn Record>),
    /// The record has no such attribute.
    Missing,
}

impl Slot<'_> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Slot::Values(v) => f.debug_tuple("Values").field(v).finish(),
            Slot::One(r) => f.debug_tuple("One").field(&r.is_some()).finish(),
            Slot::Many(r) => f.debug_tuple("Many").field(&r.len()).finish(),
            Slot::Missing => f.write_str("Missing"),
        }
    }
}

// ============================================================================
// Typing helpers for the derive macro
// ============================================================================

/// A Rust type that maps onto a search [`FieldType`].
pub trait SearchScalar {
    const FIELD_TYPE: FieldType;

    /// The value, or `None` for null.
    fn search_value(&self) -> Option<Value>;
}

/// An enum usable as a search field, generated by `#[derive(SearchableEnum)]`.
pub trait SearchEnum {
    const ENUM_TYPE: EnumType;

    /// Position of this variant in [`EnumType::members`].
    fn ordinal(&self) -> u32;

    fn enum_value(&self) -> Value {
        Value::Enum(crate::value::EnumValue {
            ty: Self::ENUM_TYPE,
            ordinal: self.ordinal(),
        })
    }
}

macro_rules! scalar {
    ($($ty:ty => $field_type:expr, |$v:ident| $value:expr;)*) => {
        $(
            impl SearchScalar for $ty {
                const FIELD_TYPE: FieldType = $field_type;

                fn search_value(&self) -> Option<Value> {
                    let $v = self;
                    Some($value)
                }
            }
        )*
    };
}

scalar! {
    String => FieldType::String, |v| Value::String(v.clone());
    bool => FieldType::Bool, |v| Value::Bool(*v);
    i8 => FieldType::I8, |v| Value::I8(*v);
    i16 => FieldType::I16, |v| Value::I16(*v);
    i32 => FieldType::I32, |v| Value::I32(*v);
    i64 => FieldType::I64, |v| Value::I64(*v);
    f32 => FieldType::F32, |v| Value::F32(*v);
    f64 => FieldType::F64, |v| Value::F64(*v);
    Decimal => FieldType::Decimal, |v| Value::Decimal(*v);
    Timestamp => FieldType::Instant, |v| Value::Instant(*v);
    Uuid => FieldType::Uuid, |v| Value::Uuid(*v);
    CurrencyCode => FieldType::Currency, |v| Value::Currency(*v);
}

impl<T: SearchScalar> SearchScalar for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;

    fn search_value(&self) -> Option<Value> {
        self.as_ref().and_then(SearchScalar::search_value)
    }
}

impl<T: SearchScalar> SearchScalar for Box<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;

    fn search_value(&self) -> Option<Value> {
        (**self).search_value()
    }
}

/// A collection of scalars, searchable as an element collection.
pub trait SearchElements {
    type Item: SearchScalar;

    fn element_values(&self) -> Vec<Value>;
}

macro_rules! elements {
    ($($collection:ident),*) => {
        $(
            impl<T: SearchScalar> SearchElements for $collection<T> {
                type Item = T;

                fn element_values(&self) -> Vec<Value> {
                    self.iter().filter_map(SearchScalar::search_value).collect()
                }
            }
        )*
    };
}

elements!(Vec, BTreeSet, HashSet);

/// A field holding related records: the record itself, an `Option`, a
/// `Box`, or a `Vec` of them.
pub trait Relation {
    type Target: Searchable + Record;

    fn related(&self) -> Vec<&Self::Target>;
}

impl<T: Relation> Relation for Option<T> {
    type Target = T::Target;

    fn related(&self) -> Vec<&Self::Target> {
        self.as_ref().map(Relation::related).unwrap_or_default()
    }
}

impl<T: Relation> Relation for Box<T> {
    type Target = T::Target;

    fn related(&self) -> Vec<&Self::Target> {
        (**self).related()
    }
}

impl<T: Relation> Relation for Vec<T> {
    type Target = T::Target;

    fn related(&self) -> Vec<&Self::Target> {
        self.iter().flat_map(Relation::related).collect()
    }
}
