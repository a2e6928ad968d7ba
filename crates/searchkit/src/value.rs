//! Semantic types and coerced runtime values.
//!
//! [`FieldType`] describes what a search field holds; [`Value`] is the typed
//! form of a raw filter string after coercion (and the form in which records
//! expose their attributes to the in-memory executor).

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoercionError;

/// Integer widths supported by the integer family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

/// Floating point widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FloatWidth {
    W32,
    W64,
}

/// An enumerated type: its name and its member names.
///
/// Member names are matched after upper-casing the raw value, so they are
/// expected in `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub name: &'static str,
    pub members: &'static [&'static str],
}

impl EnumType {
    pub const fn new(name: &'static str, members: &'static [&'static str]) -> Self {
        EnumType { name, members }
    }

    /// Looks up a member by exact name.
    pub fn member(&self, name: &str) -> Option<EnumValue> {
        self.members
            .iter()
            .position(|m| *m == name)
            .map(|ordinal| EnumValue {
                ty: *self,
                ordinal: ordinal as u32,
            })
    }

    /// Returns the member at `ordinal`, if there is one.
    pub fn at(&self, ordinal: u32) -> Option<EnumValue> {
        ((ordinal as usize) < self.members.len()).then_some(EnumValue { ty: *self, ordinal })
    }
}

/// The semantic type of a search field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Bool,
    Int(IntWidth),
    Float(FloatWidth),
    Decimal,
    Instant,
    Uuid,
    Currency,
    Enum(EnumType),
}

impl FieldType {
    pub const I8: FieldType = FieldType::Int(IntWidth::W8);
    pub const I16: FieldType = FieldType::Int(IntWidth::W16);
    pub const I32: FieldType = FieldType::Int(IntWidth::W32);
    pub const I64: FieldType = FieldType::Int(IntWidth::W64);
    pub const F32: FieldType = FieldType::Float(FloatWidth::W32);
    pub const F64: FieldType = FieldType::Float(FloatWidth::W64);

    /// Returns the payload-free kind used by the capability and coercion tables.
    pub fn kind(self) -> TypeKind {
        match self {
            FieldType::String => TypeKind::String,
            FieldType::Bool => TypeKind::Bool,
            FieldType::Int(IntWidth::W8) => TypeKind::I8,
            FieldType::Int(IntWidth::W16) => TypeKind::I16,
            FieldType::Int(IntWidth::W32) => TypeKind::I32,
            FieldType::Int(IntWidth::W64) => TypeKind::I64,
            FieldType::Float(FloatWidth::W32) => TypeKind::F32,
            FieldType::Float(FloatWidth::W64) => TypeKind::F64,
            FieldType::Decimal => TypeKind::Decimal,
            FieldType::Instant => TypeKind::Instant,
            FieldType::Uuid => TypeKind::Uuid,
            FieldType::Currency => TypeKind::Currency,
            FieldType::Enum(_) => TypeKind::Enum,
        }
    }

    /// Returns `true` for types supporting ordered comparison.
    pub fn is_ordered(self) -> bool {
        self.kind().is_ordered()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Enum(ty) => write!(f, "enum {}", ty.name),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

/// Payload-free classification of [`FieldType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Instant,
    Uuid,
    Currency,
    Enum,
}

impl TypeKind {
    pub const ALL: [TypeKind; 13] = [
        TypeKind::String,
        TypeKind::Bool,
        TypeKind::I8,
        TypeKind::I16,
        TypeKind::I32,
        TypeKind::I64,
        TypeKind::F32,
        TypeKind::F64,
        TypeKind::Decimal,
        TypeKind::Instant,
        TypeKind::Uuid,
        TypeKind::Currency,
        TypeKind::Enum,
    ];

    /// Numeric and temporal kinds.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            TypeKind::I8
                | TypeKind::I16
                | TypeKind::I32
                | TypeKind::I64
                | TypeKind::F32
                | TypeKind::F64
                | TypeKind::Decimal
                | TypeKind::Instant
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::String => "string",
            TypeKind::Bool => "boolean",
            TypeKind::I8 => "i8",
            TypeKind::I16 => "i16",
            TypeKind::I32 => "i32",
            TypeKind::I64 => "i64",
            TypeKind::F32 => "f32",
            TypeKind::F64 => "f64",
            TypeKind::Decimal => "decimal",
            TypeKind::Instant => "instant",
            TypeKind::Uuid => "uuid",
            TypeKind::Currency => "currency",
            TypeKind::Enum => "enum",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp value represented as milliseconds since Unix epoch.
///
/// ```
/// use searchkit::Timestamp;
///
/// assert!(Timestamp(1000) < Timestamp(2000));
/// assert_eq!(Timestamp::from_secs(2).as_millis(), 2000);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a new timestamp from milliseconds since Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Creates a new timestamp from seconds since Unix epoch.
    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs * 1000)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    pub fn as_secs(self) -> i64 {
        self.0 / 1000
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Timestamp(millis)
    }
}

impl From<std::time::SystemTime> for Timestamp {
    fn from(time: std::time::SystemTime) -> Self {
        match time.duration_since(std::time::UNIX_EPOCH) {
            Ok(after) => Timestamp(after.as_millis() as i64),
            Err(before) => Timestamp(-(before.duration().as_millis() as i64)),
        }
    }
}

/// An ISO 4217 style currency code, stored upper-cased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Parses a three letter code, case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, CoercionError> {
        let bytes = raw.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(CoercionError::Currency(raw.to_string()));
        }
        Ok(CurrencyCode([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::parse(s)
    }
}

/// A member of an [`EnumType`].
#[derive(Debug, Clone, Copy)]
pub struct EnumValue {
    pub ty: EnumType,
    pub ordinal: u32,
}

impl EnumValue {
    /// The member name, e.g. `ACTIVE`.
    pub fn name(&self) -> &'static str {
        self.ty
            .members
            .get(self.ordinal as usize)
            .copied()
            .unwrap_or_default()
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name && self.ordinal == other.ordinal
    }
}

impl Eq for EnumValue {}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value.
///
/// Produced by the coercion registry from raw filter strings, and by records
/// when exposing their attributes to the in-memory executor. Each variant
/// corresponds to exactly one [`TypeKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Instant(Timestamp),
    Uuid(Uuid),
    Currency(CurrencyCode),
    Enum(EnumValue),
}

impl Value {
    pub fn kind(&self) -> TypeKind {
        match self {
            Value::String(_) => TypeKind::String,
            Value::Bool(_) => TypeKind::Bool,
            Value::I8(_) => TypeKind::I8,
            Value::I16(_) => TypeKind::I16,
            Value::I32(_) => TypeKind::I32,
            Value::I64(_) => TypeKind::I64,
            Value::F32(_) => TypeKind::F32,
            Value::F64(_) => TypeKind::F64,
            Value::Decimal(_) => TypeKind::Decimal,
            Value::Instant(_) => TypeKind::Instant,
            Value::Uuid(_) => TypeKind::Uuid,
            Value::Currency(_) => TypeKind::Currency,
            Value::Enum(_) => TypeKind::Enum,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            Value::Enum(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(v) => f.write_str(v),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Instant(v) => write!(f, "{}", v.as_millis()),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Currency(v) => write!(f, "{v}"),
            Value::Enum(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    String => String,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    Timestamp => Instant,
    Uuid => Uuid,
    CurrencyCode => Currency,
    EnumValue => Enum,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Compares two values of the same kind.
///
/// Integers of different widths compare numerically; floats compare with
/// floats and integers through `f64`; enums compare by ordinal within the
/// same enum. Returns `None` on kind mismatch or NaN.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    use Value::*;

    match (a, b) {
        (String(a), String(b)) => Some(a.cmp(b)),
        (Bool(a), Bool(b)) => Some(a.cmp(b)),
        (Decimal(a), Decimal(b)) => Some(a.cmp(b)),
        (Instant(a), Instant(b)) => Some(a.cmp(b)),
        (Uuid(a), Uuid(b)) => Some(a.cmp(b)),
        (Currency(a), Currency(b)) => Some(a.cmp(b)),
        (Enum(a), Enum(b)) if a.ty.name == b.ty.name => Some(a.ordinal.cmp(&b.ordinal)),
        _ => match (as_i64(a), as_i64(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => match (as_f64(a), as_f64(b)) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        },
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::I8(n) => Some(i64::from(*n)),
        Value::I16(n) => Some(i64::from(*n)),
        Value::I32(n) => Some(i64::from(*n)),
        Value::I64(n) => Some(*n),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::F32(n) => Some(f64::from(*n)),
        Value::F64(n) => Some(*n),
        other => as_i64(other).map(|n| n as f64),
    }
}
