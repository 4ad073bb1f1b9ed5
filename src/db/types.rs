//! Database type definitions
//!
//! Core data structures for query parameters and materialized results.
//! A single [`SqlValue`] enum serves both directions: it binds positionally
//! as a statement parameter and holds decoded cell values on the way out.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::sync::Arc;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A SQL parameter or decoded cell value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value
    Null,

    /// Boolean value
    Bool(bool),

    /// Integer value (any integer width)
    Int(i64),

    /// Floating point value
    Float(f64),

    /// Exact numeric value (NUMERIC columns, prices, quantities)
    Decimal(Decimal),

    /// Text/string value
    Text(String),

    /// Timestamp value (UTC)
    Timestamp(DateTime<Utc>),

    /// JSON value (parsed)
    Json(serde_json::Value),
}

impl SqlValue {
    /// Check if this is a NULL value
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Integer view, when the value is integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Decimal(d) => d.to_i64(),
            _ => None,
        }
    }

    /// Lossy numeric view across the numeric variants
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Int(v) => Some(*v as f64),
            SqlValue::Float(v) => Some(*v),
            SqlValue::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Exact numeric view across the numeric variants
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SqlValue::Int(v) => Some(Decimal::from(*v)),
            SqlValue::Float(v) => Decimal::from_f64(*v),
            SqlValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// String view for text values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a JSON value for structured responses
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Int(v) => serde_json::Value::from(*v),
            SqlValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            SqlValue::Decimal(d) => match d.to_f64().and_then(serde_json::Number::from_f64) {
                Some(n) => serde_json::Value::Number(n),
                None => serde_json::Value::String(d.to_string()),
            },
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
            SqlValue::Timestamp(ts) => serde_json::Value::String(ts.to_rfc3339()),
            SqlValue::Json(v) => v.clone(),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

/// Positional binding: one value coerces to whatever wire type the target
/// column expects, so callers never pick integer widths by hand.
impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql(ty, out),
            SqlValue::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            SqlValue::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64(*v)
                    .ok_or_else(|| format!("{v} has no NUMERIC representation"))?
                    .to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            SqlValue::Decimal(v) => match *ty {
                Type::FLOAT4 | Type::FLOAT8 => v
                    .to_f64()
                    .ok_or_else(|| format!("{v} has no float representation"))?
                    .to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            SqlValue::Text(v) => v.as_str().to_sql(ty, out),
            SqlValue::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            SqlValue::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Coercion happens per-value in to_sql
        true
    }

    to_sql_checked!();
}

/// One result row: an ordered column-name → value mapping
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Look up a value by column name
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.values.get(idx)
    }

    /// Cell values in column order
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Column names, in result order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Materialized read-statement results
#[derive(Debug, Clone)]
pub struct QueryResults {
    /// Column names in result order
    pub columns: Arc<Vec<String>>,
    /// Result rows
    pub rows: Vec<Row>,
}

impl QueryResults {
    pub fn new(columns: Arc<Vec<String>>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The first row, if any
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

/// Decode a cell from a wire row based on the column's declared type.
///
/// Tries the expected type first, then falls back to a string representation.
/// Returns `SqlValue::Null` only for actual NULL values.
pub(crate) fn extract_value(row: &tokio_postgres::Row, idx: usize) -> SqlValue {
    let ty = row.columns().get(idx).map(|c| c.type_().clone());
    let Some(ty) = ty else {
        return SqlValue::Null;
    };

    match ty {
        Type::BOOL => match row.try_get::<_, Option<bool>>(idx) {
            Ok(Some(v)) => SqlValue::Bool(v),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::INT2 => match row.try_get::<_, Option<i16>>(idx) {
            Ok(Some(v)) => SqlValue::Int(v as i64),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::INT4 => match row.try_get::<_, Option<i32>>(idx) {
            Ok(Some(v)) => SqlValue::Int(v as i64),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::INT8 => match row.try_get::<_, Option<i64>>(idx) {
            Ok(Some(v)) => SqlValue::Int(v),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::FLOAT4 => match row.try_get::<_, Option<f32>>(idx) {
            Ok(Some(v)) => SqlValue::Float(v as f64),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::FLOAT8 => match row.try_get::<_, Option<f64>>(idx) {
            Ok(Some(v)) => SqlValue::Float(v),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::NUMERIC => match row.try_get::<_, Option<Decimal>>(idx) {
            Ok(Some(v)) => SqlValue::Decimal(v),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::JSON | Type::JSONB => match row.try_get::<_, Option<serde_json::Value>>(idx) {
            Ok(Some(v)) => SqlValue::Json(v),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::TIMESTAMPTZ => match row.try_get::<_, Option<DateTime<Utc>>>(idx) {
            Ok(Some(v)) => SqlValue::Timestamp(v),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::TIMESTAMP => match row.try_get::<_, Option<chrono::NaiveDateTime>>(idx) {
            Ok(Some(v)) => SqlValue::Timestamp(v.and_utc()),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        Type::DATE => match row.try_get::<_, Option<chrono::NaiveDate>>(idx) {
            Ok(Some(v)) => SqlValue::Text(v.to_string()),
            Ok(None) => SqlValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        // Text types and fallback for everything else
        _ => try_as_string(row, idx),
    }
}

/// Try to extract a value as a string (fallback for type mismatches)
fn try_as_string(row: &tokio_postgres::Row, idx: usize) -> SqlValue {
    match row.try_get::<_, Option<String>>(idx) {
        Ok(Some(v)) => SqlValue::Text(v),
        Ok(None) => SqlValue::Null,
        Err(_) => {
            let type_name = row
                .columns()
                .get(idx)
                .map_or("unknown", |c| c.type_().name());
            SqlValue::Text(format!("<unable to decode: {}>", type_name))
        }
    }
}
