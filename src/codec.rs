//! Scalar codec - record field values to storage primitives and back
//!
//! Recognized kinds map onto the four SQLite storage classes:
//! - integers and 64-bit integers → `INTEGER`
//! - booleans → `INTEGER` holding 0 or 1
//! - single and double precision floats → `REAL`
//! - text, and any [`FieldKind::Other`] through its string form → `TEXT`

use std::fmt;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use crate::schema::{EntityType, FieldDef, FieldKind, IDENTITY_FIELD};
use crate::{Error, Result};

/// A storage-side primitive as read from or written to a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Integer(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(Sql::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Integer(i)),
            ValueRef::Real(r) => Ok(Value::Real(r)),
            ValueRef::Text(t) => Ok(Value::Text(String::from_utf8_lossy(t).into_owned())),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// The in-memory value of a scalar record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Long(i64),
    Bool(bool),
    Float(f32),
    Double(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Rust types that can live in a scalar record field.
///
/// Implemented for `i32`, `i64`, `bool`, `f32`, `f64` and `String`. Other
/// types can opt into the text fallback with [`text_scalar!`](crate::text_scalar).
pub trait Scalar: Sized {
    const KIND: FieldKind;

    fn to_field(&self) -> FieldValue;

    fn from_field(value: FieldValue) -> std::result::Result<Self, String>;
}

macro_rules! impl_scalar {
    ($ty:ty, $kind:ident, $variant:ident $(, $widen:ident)?) => {
        impl Scalar for $ty {
            const KIND: FieldKind = FieldKind::$kind;

            fn to_field(&self) -> FieldValue {
                FieldValue::$variant(self.clone())
            }

            fn from_field(value: FieldValue) -> std::result::Result<Self, String> {
                match value {
                    FieldValue::$variant(v) => Ok(v),
                    $(FieldValue::$widen(v) => Ok(v.into()),)?
                    other => Err(format!("expected {}, got {:?}", FieldKind::$kind, other)),
                }
            }
        }
    };
}

impl_scalar!(i64, BigInt, Long, Int);
impl_scalar!(bool, Boolean, Bool);
impl_scalar!(f32, Float, Float);
impl_scalar!(f64, Double, Double, Float);
impl_scalar!(String, Text, Text);

impl Scalar for i32 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_field(&self) -> FieldValue {
        FieldValue::Int(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, String> {
        match value {
            FieldValue::Int(v) => Ok(v),
            FieldValue::Long(v) => i32::try_from(v).map_err(|_| format!("{} does not fit in i32", v)),
            other => Err(format!("expected integer, got {:?}", other)),
        }
    }
}

/// Implement [`Scalar`] for types stored through their string form.
///
/// The type must implement `Display` and `FromStr` with a displayable error.
#[macro_export]
macro_rules! text_scalar {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::Scalar for $ty {
            const KIND: $crate::FieldKind = $crate::FieldKind::Other;

            fn to_field(&self) -> $crate::FieldValue {
                $crate::FieldValue::Text(self.to_string())
            }

            fn from_field(value: $crate::FieldValue) -> ::std::result::Result<Self, String> {
                match value {
                    $crate::FieldValue::Text(s) => s.parse::<$ty>().map_err(|e| e.to_string()),
                    other => Err(format!("expected text, got {:?}", other)),
                }
            }
        }
    )+};
}

/// Encode a field value as the storage primitive for `kind`.
pub fn encode(value: &FieldValue, kind: &FieldKind) -> std::result::Result<Value, String> {
    match (kind, value) {
        (FieldKind::Integer, FieldValue::Int(v)) => Ok(Value::Integer(i64::from(*v))),
        (FieldKind::BigInt, FieldValue::Long(v)) => Ok(Value::Integer(*v)),
        (FieldKind::BigInt, FieldValue::Int(v)) => Ok(Value::Integer(i64::from(*v))),
        (FieldKind::Boolean, FieldValue::Bool(v)) => Ok(Value::Integer(i64::from(*v))),
        (FieldKind::Float, FieldValue::Float(v)) => Ok(Value::Real(f64::from(*v))),
        (FieldKind::Double, FieldValue::Double(v)) => Ok(Value::Real(*v)),
        (FieldKind::Double, FieldValue::Float(v)) => Ok(Value::Real(f64::from(*v))),
        (FieldKind::Text, FieldValue::Text(v)) => Ok(Value::Text(v.clone())),
        // Permissive fallback: anything else is stored as its string form
        (FieldKind::Other, v) => Ok(Value::Text(v.to_string())),
        (FieldKind::Collection(_), _) => Err("collection fields have no column".to_string()),
        (kind, v) => Err(format!("expected {}, got {:?}", kind, v)),
    }
}

/// Decode a storage primitive into a field value of `kind`.
///
/// `Null` decodes to `None`, leaving the field at its default.
pub fn decode(value: &Value, kind: &FieldKind) -> std::result::Result<Option<FieldValue>, String> {
    let decoded = match (kind, value) {
        (_, Value::Null) => return Ok(None),
        (FieldKind::Integer, Value::Integer(i)) => {
            FieldValue::Int(i32::try_from(*i).map_err(|_| format!("{} does not fit in i32", i))?)
        }
        (FieldKind::BigInt, Value::Integer(i)) => FieldValue::Long(*i),
        (FieldKind::Boolean, Value::Integer(i)) => FieldValue::Bool(*i == 1),
        (FieldKind::Float, Value::Real(r)) => FieldValue::Float(*r as f32),
        (FieldKind::Float, Value::Integer(i)) => FieldValue::Float(*i as f32),
        (FieldKind::Double, Value::Real(r)) => FieldValue::Double(*r),
        (FieldKind::Double, Value::Integer(i)) => FieldValue::Double(*i as f64),
        (FieldKind::Text, Value::Text(s)) => FieldValue::Text(s.clone()),
        (FieldKind::Text | FieldKind::Other, v) => FieldValue::Text(v.to_string()),
        (FieldKind::Collection(_), _) => return Err("collection fields have no column".to_string()),
        (kind, v) => return Err(format!("cannot read {} from {:?}", kind, v)),
    };
    Ok(Some(decoded))
}

/// Encode one field of a record for a row write.
///
/// Returns `None` for a 64-bit `id` field still holding the unset sentinel,
/// so storage assigns the identity.
pub fn encode_field(entity: &EntityType, field: &FieldDef, value: &FieldValue) -> Result<Option<Value>> {
    if field.name == IDENTITY_FIELD
        && field.kind == FieldKind::BigInt
        && matches!(value, FieldValue::Long(0) | FieldValue::Int(0))
    {
        return Ok(None);
    }
    encode(value, &field.kind)
        .map(Some)
        .map_err(|reason| Error::encoding(entity.name, field.name, reason))
}

/// Decode one column of a row into a field value.
pub fn decode_field(entity: &EntityType, field: &FieldDef, value: &Value) -> Result<Option<FieldValue>> {
    decode(value, &field.kind).map_err(|reason| Error::encoding(entity.name, field.name, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_recognized_kinds() {
        assert_eq!(encode(&FieldValue::Int(7), &FieldKind::Integer), Ok(Value::Integer(7)));
        assert_eq!(encode(&FieldValue::Long(1 << 40), &FieldKind::BigInt), Ok(Value::Integer(1 << 40)));
        assert_eq!(encode(&FieldValue::Bool(true), &FieldKind::Boolean), Ok(Value::Integer(1)));
        assert_eq!(encode(&FieldValue::Bool(false), &FieldKind::Boolean), Ok(Value::Integer(0)));
        assert_eq!(encode(&FieldValue::Float(1.5), &FieldKind::Float), Ok(Value::Real(1.5)));
        assert_eq!(encode(&FieldValue::Double(2.25), &FieldKind::Double), Ok(Value::Real(2.25)));
        assert_eq!(
            encode(&FieldValue::Text("hi".into()), &FieldKind::Text),
            Ok(Value::Text("hi".into()))
        );
    }

    #[test]
    fn test_other_kind_falls_back_to_text() {
        assert_eq!(encode(&FieldValue::Int(42), &FieldKind::Other), Ok(Value::Text("42".into())));
        assert_eq!(
            decode(&Value::Integer(42), &FieldKind::Other),
            Ok(Some(FieldValue::Text("42".into())))
        );
    }

    #[test]
    fn test_mismatched_kind_is_an_error() {
        assert!(encode(&FieldValue::Text("x".into()), &FieldKind::Integer).is_err());
        assert!(decode(&Value::Text("x".into()), &FieldKind::BigInt).is_err());
        assert!(decode(&Value::Integer(i64::MAX), &FieldKind::Integer).is_err());
    }

    #[test]
    fn test_decode_booleans_and_null() {
        assert_eq!(decode(&Value::Integer(1), &FieldKind::Boolean), Ok(Some(FieldValue::Bool(true))));
        assert_eq!(decode(&Value::Integer(0), &FieldKind::Boolean), Ok(Some(FieldValue::Bool(false))));
        assert_eq!(decode(&Value::Null, &FieldKind::Text), Ok(None));
    }

    #[test]
    fn test_scalar_widening() {
        assert_eq!(i64::from_field(FieldValue::Int(3)), Ok(3));
        assert_eq!(f64::from_field(FieldValue::Float(0.5)), Ok(0.5));
        assert_eq!(i32::from_field(FieldValue::Long(9)), Ok(9));
        assert!(i32::from_field(FieldValue::Long(i64::MAX)).is_err());
        assert!(bool::from_field(FieldValue::Int(1)).is_err());
    }
}
