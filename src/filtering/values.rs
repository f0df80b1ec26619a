//! Coercion of request values into typed `sea_orm::Value`s.
//!
//! Filter values arrive as strings; record payloads arrive as JSON. Both are
//! converted according to the column's [`ColumnKind`] so that the value type
//! always matches the Rust field type Sea-ORM generated for the column.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::{ColumnTrait, Value};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::core::descriptor::{ColumnInfo, ColumnKind};
use crate::errors::{CrudError, CrudResult};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn invalid<C: ColumnTrait>(info: &ColumnInfo<C>, expected: &str, raw: &str) -> CrudError {
    CrudError::validation(format!("{}: expected {expected}, got '{raw}'", info.name()))
}

fn parse_int<C: ColumnTrait, T: TryFrom<i64>>(info: &ColumnInfo<C>, raw: &str) -> CrudResult<T> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| invalid(info, "integer", raw))
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Accepts RFC 3339; naive timestamps and bare dates are read as UTC
fn parse_timestamp_tz(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .or_else(|| parse_naive(raw).map(|n| n.and_utc().fixed_offset()))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    parse_naive(raw).or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).naive_utc())
    })
}

/// Convert a string-encoded value to the column's type
///
/// # Errors
/// `ValidationError` naming the column when the text does not parse
pub fn coerce_text<C: ColumnTrait>(info: &ColumnInfo<C>, raw: &str) -> CrudResult<Value> {
    let value = match info.kind() {
        ColumnKind::String | ColumnKind::Other => raw.to_owned().into(),
        ColumnKind::TinyInteger => parse_int::<C, i8>(info, raw)?.into(),
        ColumnKind::SmallInteger => parse_int::<C, i16>(info, raw)?.into(),
        ColumnKind::Integer => parse_int::<C, i32>(info, raw)?.into(),
        ColumnKind::BigInteger => parse_int::<C, i64>(info, raw)?.into(),
        ColumnKind::Float => raw
            .trim()
            .parse::<f32>()
            .map_err(|_| invalid(info, "number", raw))?
            .into(),
        ColumnKind::Double => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(info, "number", raw))?
            .into(),
        ColumnKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => true.into(),
            "false" | "0" => false.into(),
            _ => return Err(invalid(info, "boolean", raw)),
        },
        ColumnKind::TimestampTz => parse_timestamp_tz(raw.trim())
            .ok_or_else(|| invalid(info, "timestamp", raw))?
            .into(),
        ColumnKind::Timestamp => parse_timestamp(raw.trim())
            .ok_or_else(|| invalid(info, "timestamp", raw))?
            .into(),
        ColumnKind::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| invalid(info, "date", raw))?
            .into(),
        ColumnKind::Uuid => Uuid::parse_str(raw.trim())
            .map_err(|_| invalid(info, "uuid", raw))?
            .into(),
        // Text that is not valid JSON is stored as a JSON string
        ColumnKind::Json => serde_json::from_str::<JsonValue>(raw)
            .unwrap_or_else(|_| JsonValue::String(raw.to_owned()))
            .into(),
        ColumnKind::Binary => raw.as_bytes().to_vec().into(),
    };
    Ok(value)
}

/// Typed SQL NULL for the column
#[must_use]
pub fn null_for(kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::String | ColumnKind::Other => Value::from(None::<String>),
        ColumnKind::TinyInteger => Value::from(None::<i8>),
        ColumnKind::SmallInteger => Value::from(None::<i16>),
        ColumnKind::Integer => Value::from(None::<i32>),
        ColumnKind::BigInteger => Value::from(None::<i64>),
        ColumnKind::Float => Value::from(None::<f32>),
        ColumnKind::Double => Value::from(None::<f64>),
        ColumnKind::Boolean => Value::from(None::<bool>),
        ColumnKind::Timestamp => Value::from(None::<NaiveDateTime>),
        ColumnKind::TimestampTz => Value::from(None::<DateTime<FixedOffset>>),
        ColumnKind::Date => Value::from(None::<NaiveDate>),
        ColumnKind::Uuid => Value::from(None::<Uuid>),
        ColumnKind::Json => Value::from(None::<JsonValue>),
        ColumnKind::Binary => Value::from(None::<Vec<u8>>),
    }
}

/// Convert a JSON payload value to the column's type.
///
/// JSON strings are accepted for every kind and parsed like filter text, so
/// timestamps, uuids and numeric strings all work. `null` becomes a typed
/// NULL; whether the column accepts it is decided by the caller.
///
/// # Errors
/// `ValidationError` naming the column on a type mismatch
pub fn coerce_json<C: ColumnTrait>(info: &ColumnInfo<C>, value: &JsonValue) -> CrudResult<Value> {
    let kind = info.kind();
    match (kind, value) {
        (_, JsonValue::Null) => Ok(null_for(kind)),
        (ColumnKind::Json, other) => Ok(other.clone().into()),
        (_, JsonValue::String(s)) => coerce_text(info, s),
        (
            ColumnKind::TinyInteger
            | ColumnKind::SmallInteger
            | ColumnKind::Integer
            | ColumnKind::BigInteger,
            JsonValue::Number(n),
        ) => match n.as_i64() {
            Some(v) => coerce_text(info, &v.to_string()),
            None => Err(invalid(info, "integer", &n.to_string())),
        },
        (ColumnKind::Float | ColumnKind::Double, JsonValue::Number(n)) => {
            let v = n.as_f64().ok_or_else(|| invalid(info, "number", &n.to_string()))?;
            #[allow(clippy::cast_possible_truncation)]
            let out = if kind == ColumnKind::Float {
                Value::from(v as f32)
            } else {
                Value::from(v)
            };
            Ok(out)
        }
        (ColumnKind::Boolean, JsonValue::Bool(b)) => Ok((*b).into()),
        (ColumnKind::Binary, JsonValue::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| invalid(info, "byte array", &item.to_string()))
            })
            .collect::<CrudResult<Vec<u8>>>()
            .map(Value::from),
        (_, other) => Err(invalid(info, kind_label(kind), &other.to_string())),
    }
}

const fn kind_label(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::String | ColumnKind::Other => "string",
        ColumnKind::TinyInteger
        | ColumnKind::SmallInteger
        | ColumnKind::Integer
        | ColumnKind::BigInteger => "integer",
        ColumnKind::Float | ColumnKind::Double => "number",
        ColumnKind::Boolean => "boolean",
        ColumnKind::Timestamp | ColumnKind::TimestampTz => "timestamp",
        ColumnKind::Date => "date",
        ColumnKind::Uuid => "uuid",
        ColumnKind::Json => "json",
        ColumnKind::Binary => "binary",
    }
}
