//! String → [`Value`] conversion per semantic type.

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::CoercionError;
use crate::value::{CurrencyCode, EnumType, FieldType, Timestamp, TypeKind, Value};

/// Conversion function for one scalar kind.
pub type CoerceFn = fn(&str) -> Result<Value, CoercionError>;

/// Maps each semantic type to its conversion function.
///
/// Enumerations are not registered per type: they are resolved from the
/// [`EnumType`] carried by the field, by upper-casing the raw value and
/// matching it against the member names.
///
/// ```
/// use searchkit::{CoercionRegistry, FieldType, Value};
///
/// let registry = CoercionRegistry::standard();
/// assert_eq!(registry.coerce(FieldType::I32, "42").unwrap(), Value::I32(42));
/// assert!(registry.coerce(FieldType::I8, "300").is_err());
/// ```
#[derive(Clone)]
pub struct CoercionRegistry {
    functions: HashMap<TypeKind, CoerceFn>,
}

impl CoercionRegistry {
    /// Registry covering every non-enum [`TypeKind`].
    pub fn standard() -> Self {
        let entries: [(TypeKind, CoerceFn); 12] = [
            (TypeKind::String, |raw| Ok(Value::String(raw.to_string()))),
            (TypeKind::Bool, to_bool),
            (TypeKind::I8, |raw| Ok(Value::I8(raw.parse()?))),
            (TypeKind::I16, |raw| Ok(Value::I16(raw.parse()?))),
            (TypeKind::I32, |raw| Ok(Value::I32(raw.parse()?))),
            (TypeKind::I64, |raw| Ok(Value::I64(raw.parse()?))),
            (TypeKind::F32, |raw| Ok(Value::F32(raw.parse()?))),
            (TypeKind::F64, |raw| Ok(Value::F64(raw.parse()?))),
            (TypeKind::Decimal, to_decimal),
            (TypeKind::Instant, |raw| {
                Ok(Value::Instant(Timestamp::from_millis(raw.parse()?)))
            }),
            (TypeKind::Uuid, |raw| Ok(Value::Uuid(Uuid::parse_str(raw)?))),
            (TypeKind::Currency, |raw| {
                Ok(Value::Currency(CurrencyCode::parse(raw)?))
            }),
        ];
        CoercionRegistry {
            functions: entries.into_iter().collect(),
        }
    }

    /// Returns a registry with `kind` converted by `function` instead.
    pub fn with(mut self, kind: TypeKind, function: CoerceFn) -> Self {
        self.functions.insert(kind, function);
        self
    }

    /// Returns `true` if values of `ty` can be coerced.
    pub fn supports(&self, ty: FieldType) -> bool {
        matches!(ty, FieldType::Enum(_)) || self.functions.contains_key(&ty.kind())
    }

    /// Coerces `raw` into a value of type `ty`.
    ///
    /// A registered function that yields a value of another kind is reported
    /// as [`CoercionError::WrongKind`].
    pub fn coerce(&self, ty: FieldType, raw: &str) -> Result<Value, CoercionError> {
        match ty {
            FieldType::Enum(enum_type) => to_enum(enum_type, raw),
            other => {
                let expected = other.kind();
                let function = self
                    .functions
                    .get(&expected)
                    .ok_or(CoercionError::Unsupported(expected))?;
                let value = function(raw)?;
                if value.kind() != expected {
                    return Err(CoercionError::WrongKind {
                        expected,
                        got: value.kind(),
                    });
                }
                Ok(value)
            }
        }
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        CoercionRegistry::standard()
    }
}

impl fmt::Debug for CoercionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.functions.keys().copied().collect();
        kinds.sort();
        f.debug_struct("CoercionRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

fn to_bool(raw: &str) -> Result<Value, CoercionError> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(Value::Bool(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(Value::Bool(false))
    } else {
        Err(CoercionError::Boolean(raw.to_string()))
    }
}

fn to_decimal(raw: &str) -> Result<Value, CoercionError> {
    let parsed = raw
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))?;
    Ok(Value::Decimal(parsed))
}

fn to_enum(enum_type: EnumType, raw: &str) -> Result<Value, CoercionError> {
    let upper = raw.to_uppercase();
    enum_type
        .member(&upper)
        .map(Value::Enum)
        .ok_or(CoercionError::UnknownMember {
            enum_name: enum_type.name,
            value: upper,
            members: enum_type.members,
        })
}
