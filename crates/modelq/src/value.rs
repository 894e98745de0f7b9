//! Scalar values exchanged with executors.
//!
//! [`Value`] is the cell type of a raw row and the type of a bound parameter.
//! [`FromValue`] pulls typed data back out for entity hydration.

use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use uuid::Uuid;

/// A single scalar cell or parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integer columns (MySQL `BIGINT UNSIGNED` can exceed `i64`).
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v $(as $cast)?)
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt,
    f32 => Float as f64,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<Utc> => Timestamp,
    Uuid => Uuid,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Typed extraction from a [`Value`].
///
/// `column` is only used to build [`OrmError::Decode`] messages.
pub trait FromValue: Sized {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self>;
}

fn mismatch(column: &str, expected: &str, value: &Value) -> OrmError {
    OrmError::decode(
        column,
        format!("expected {expected}, got {}", value.kind()),
    )
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v, column).map(Some),
        }
    }
}

fn as_i128(value: &Value, column: &str, expected: &str) -> OrmResult<i128> {
    match value {
        Value::Int(v) => Ok(*v as i128),
        Value::UInt(v) => Ok(*v as i128),
        // SQLite/MySQL report booleans as 0/1 integers and some drivers go the other way.
        Value::Bool(b) => Ok(*b as i128),
        Value::Decimal(d) if d.fract().is_zero() => d
            .to_i128()
            .ok_or_else(|| OrmError::decode(column, format!("{d} out of range for {expected}"))),
        Value::Text(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|e| OrmError::decode(column, format!("cannot parse '{s}' as {expected}: {e}"))),
        v => Err(mismatch(column, expected, v)),
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
                    let wide = as_i128(value, column, stringify!($ty))?;
                    <$ty>::try_from(wide).map_err(|_| {
                        OrmError::decode(column, format!("{wide} out of range for {}", stringify!($ty)))
                    })
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for bool {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(0) | Value::UInt(0) => Ok(false),
            Value::Int(1) | Value::UInt(1) => Ok(true),
            v => Err(mismatch(column, "bool", v)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::UInt(u) => Ok(*u as f64),
            Value::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| OrmError::decode(column, format!("{d} not representable as f64"))),
            v => Err(mismatch(column, "f64", v)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        let wide = f64::from_value(value, column)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(OrmError::decode(column, format!("{wide} out of range for f32")));
        }
        Ok(wide as f32)
    }
}

impl FromValue for Decimal {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(i) => Ok(Decimal::from(*i)),
            Value::UInt(u) => Ok(Decimal::from(*u)),
            Value::Float(f) => Decimal::try_from(*f)
                .map_err(|e| OrmError::decode(column, e.to_string())),
            Value::Text(s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|e| OrmError::decode(column, format!("cannot parse '{s}' as decimal: {e}"))),
            v => Err(mismatch(column, "decimal", v)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Uuid(u) => Ok(u.to_string()),
            Value::Decimal(d) => Ok(d.to_string()),
            v => Err(mismatch(column, "text", v)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            v => Err(mismatch(column, "bytes", v)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| OrmError::decode(column, format!("cannot parse '{s}' as date: {e}"))),
            v => Err(mismatch(column, "date", v)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Time(t) => Ok(*t),
            Value::Text(s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map_err(|e| OrmError::decode(column, format!("cannot parse '{s}' as time: {e}"))),
            v => Err(mismatch(column, "time", v)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Timestamp(ts) => Ok(ts.naive_utc()),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map_err(
                |e| OrmError::decode(column, format!("cannot parse '{s}' as datetime: {e}")),
            ),
            v => Err(mismatch(column, "datetime", v)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::DateTime(dt) => Ok(dt.and_utc()),
            v => Err(mismatch(column, "timestamp", v)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s)
                .map_err(|e| OrmError::decode(column, format!("cannot parse '{s}' as uuid: {e}"))),
            v => Err(mismatch(column, "uuid", v)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value, column: &str) -> OrmResult<Self> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::Text(s) => {
                serde_json::from_str(s).map_err(|e| OrmError::decode(column, e.to_string()))
            }
            v => Err(mismatch(column, "json", v)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value, _column: &str) -> OrmResult<Self> {
        Ok(value.clone())
    }
}
