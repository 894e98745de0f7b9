//! tokio-postgres support: `ToSql` for [`Value`] and the client executors.

use super::{Executor, RowCursor};
use crate::dialect::{Dialect, Postgres};
use crate::error::{OrmError, OrmResult};
use crate::query::CompiledStatement;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSqlOwned, IsNull, ToSql, Type};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// Encode through `T` after checking that `T` accepts the server type.
fn encode<T: ToSql>(value: &T, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !T::accepts(ty) {
        return Err(format!("cannot bind {} to a {ty} parameter", std::any::type_name::<T>()).into());
    }
    value.to_sql(ty, out)
}

fn encode_int(v: i128, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => i64::try_from(v)?.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::CHAR => i8::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from_i128_with_scale(v, 0).to_sql(ty, out),
        Type::BOOL => (v != 0).to_sql(ty, out),
        _ => encode(&v.to_string(), ty, out),
    }
}

fn encode_float(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql(ty, out),
        _ => encode(&v, ty, out),
    }
}

fn encode_decimal(v: &Decimal, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 | Type::FLOAT8 => {
            let f = v
                .to_f64()
                .ok_or_else(|| format!("decimal {v} does not fit a {ty} parameter"))?;
            encode_float(f, ty, out)
        }
        Type::INT2 | Type::INT4 | Type::INT8 if v.fract().is_zero() => {
            let i = v
                .to_i64()
                .ok_or_else(|| format!("decimal {v} does not fit a {ty} parameter"))?;
            encode_int(i128::from(i), ty, out)
        }
        _ => encode(v, ty, out),
    }
}

/// Binds adapt to the parameter type the server inferred, so an `Int` can
/// fill an `int2`, `int4`, `int8` or `numeric` placeholder.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => encode(b, ty, out),
            Value::Int(i) => encode_int(i128::from(*i), ty, out),
            Value::UInt(u) => encode_int(i128::from(*u), ty, out),
            Value::Float(f) => encode_float(*f, ty, out),
            Value::Decimal(d) => encode_decimal(d, ty, out),
            Value::Text(s) => encode(s, ty, out),
            Value::Bytes(b) => encode(b, ty, out),
            Value::Date(d) => encode(d, ty, out),
            Value::Time(t) => encode(t, ty, out),
            Value::DateTime(dt) => match *ty {
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                _ => encode(dt, ty, out),
            },
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                _ => encode(ts, ty, out),
            },
            Value::Uuid(u) => encode(u, ty, out),
            Value::Json(j) => encode(j, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn cell<T: FromSqlOwned>(row: &Row, idx: usize, wrap: impl FnOnce(T) -> Value) -> OrmResult<Value> {
    row.try_get::<_, Option<T>>(idx)
        .map(|v| v.map_or(Value::Null, wrap))
        .map_err(|e| OrmError::decode(row.columns()[idx].name(), e.to_string()))
}

fn decode_cell(row: &Row, idx: usize) -> OrmResult<Value> {
    let ty = row.columns()[idx].type_();
    match *ty {
        Type::BOOL => cell::<bool>(row, idx, Value::Bool),
        Type::CHAR => cell::<i8>(row, idx, Value::from),
        Type::INT2 => cell::<i16>(row, idx, Value::from),
        Type::INT4 => cell::<i32>(row, idx, Value::from),
        Type::INT8 => cell::<i64>(row, idx, Value::Int),
        Type::OID => cell::<u32>(row, idx, Value::from),
        Type::FLOAT4 => cell::<f32>(row, idx, Value::from),
        Type::FLOAT8 => cell::<f64>(row, idx, Value::Float),
        Type::NUMERIC => cell::<Decimal>(row, idx, Value::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            cell::<String>(row, idx, Value::Text)
        }
        Type::BYTEA => cell::<Vec<u8>>(row, idx, Value::Bytes),
        Type::DATE => cell::<NaiveDate>(row, idx, Value::Date),
        Type::TIME => cell::<NaiveTime>(row, idx, Value::Time),
        Type::TIMESTAMP => cell::<NaiveDateTime>(row, idx, Value::DateTime),
        Type::TIMESTAMPTZ => cell::<DateTime<Utc>>(row, idx, Value::Timestamp),
        Type::UUID => cell::<Uuid>(row, idx, Value::Uuid),
        Type::JSON | Type::JSONB => cell::<serde_json::Value>(row, idx, Value::Json),
        // Enums and domains over text decode as strings.
        _ => cell::<String>(row, idx, Value::Text).map_err(|_| {
            OrmError::decode(
                row.columns()[idx].name(),
                format!("unsupported column type {ty}"),
            )
        }),
    }
}

fn decode_row(row: &Row) -> OrmResult<Vec<Value>> {
    (0..row.len()).map(|idx| decode_cell(row, idx)).collect()
}

/// Prepare for the header, then run. Rows are decoded as the cursor advances.
macro_rules! impl_pg_executor {
    ($($client:ty),* $(,)?) => {
        $(
            impl Executor for $client {
                fn dialect(&self) -> &dyn Dialect {
                    &Postgres
                }

                async fn fetch(&self, stmt: &CompiledStatement) -> OrmResult<RowCursor> {
                    let prepared = self
                        .prepare(&stmt.sql)
                        .await
                        .map_err(OrmError::from_db_error)?;
                    let params: Vec<&(dyn ToSql + Sync)> = stmt
                        .params
                        .iter()
                        .map(|v| v as &(dyn ToSql + Sync))
                        .collect();
                    let rows = self
                        .query(&prepared, &params)
                        .await
                        .map_err(OrmError::from_db_error)?;
                    let header: Arc<[String]> = prepared
                        .columns()
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect();
                    Ok(RowCursor::new(header, rows.into_iter().map(|row| decode_row(&row))))
                }
            }
        )*
    };
}

impl_pg_executor!(tokio_postgres::Client, tokio_postgres::Transaction<'_>);

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(value: &Value, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut out = BytesMut::new();
        value.to_sql(ty, &mut out)?;
        Ok(out.to_vec())
    }

    #[test]
    fn int_adapts_to_parameter_width() {
        assert_eq!(bind(&Value::Int(7), &Type::INT2).unwrap(), 7i16.to_be_bytes());
        assert_eq!(bind(&Value::Int(7), &Type::INT4).unwrap(), 7i32.to_be_bytes());
        assert_eq!(bind(&Value::UInt(7), &Type::INT8).unwrap(), 7i64.to_be_bytes());
        assert!(bind(&Value::Int(70_000), &Type::INT2).is_err());
    }

    #[test]
    fn mismatched_types_are_rejected() {
        assert!(bind(&Value::Text("x".into()), &Type::INT4).is_err());
        assert!(bind(&Value::Bool(true), &Type::TEXT).is_err());
        assert_eq!(bind(&Value::Text("x".into()), &Type::VARCHAR).unwrap(), b"x");
    }

    #[test]
    fn null_binds_as_null() {
        let mut out = BytesMut::new();
        assert!(matches!(Value::Null.to_sql(&Type::INT4, &mut out), Ok(IsNull::Yes)));
        assert!(out.is_empty());
    }

    #[test]
    fn float_narrows_for_float4() {
        assert_eq!(bind(&Value::Float(1.5), &Type::FLOAT4).unwrap(), 1.5f32.to_be_bytes());
        assert_eq!(bind(&Value::Int(2), &Type::FLOAT8).unwrap(), 2f64.to_be_bytes());
    }
}
