//! Table to Arrow RecordBatch conversion

use super::types::Table;
use crate::error::{Error, Result};
use crate::parse::Scalar;
use crate::types::ScalarType;
use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::sync::Arc;

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Arrow type of a column type
pub fn arrow_type(ty: ScalarType) -> DataType {
    match ty {
        ScalarType::String => DataType::Utf8,
        ScalarType::Integer => DataType::Int64,
        ScalarType::Double => DataType::Float64,
        ScalarType::Boolean => DataType::Boolean,
        ScalarType::Date => DataType::Date32,
        ScalarType::DateTime => DataType::Timestamp(TimeUnit::Millisecond, None),
    }
}

/// Arrow schema of a table; every field is nullable
pub fn arrow_schema(table: &Table) -> Schema {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(&c.name, arrow_type(c.data_type), true))
        .collect();
    Schema::new(fields)
}

/// Convert a table to a single RecordBatch
///
/// Values that do not fit their column's type become nulls.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let schema = Arc::new(arrow_schema(table));

    let arrays: Vec<ArrayRef> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let values = table.rows().iter().map(|row| &row[index]);
            build_array(values, column.data_type)
        })
        .collect();

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| Error::output(format!("Failed to create RecordBatch: {e}")))
}

fn build_array<'a>(values: impl Iterator<Item = &'a Scalar>, ty: ScalarType) -> ArrayRef {
    match ty {
        ScalarType::String => Arc::new(StringArray::from(
            values.map(Scalar::as_param).collect::<Vec<_>>(),
        )),
        ScalarType::Integer => Arc::new(Int64Array::from(
            values.map(as_i64).collect::<Vec<_>>(),
        )),
        ScalarType::Double => Arc::new(Float64Array::from(
            values.map(as_f64).collect::<Vec<_>>(),
        )),
        ScalarType::Boolean => Arc::new(BooleanArray::from(
            values.map(as_bool).collect::<Vec<_>>(),
        )),
        ScalarType::Date => Arc::new(Date32Array::from(
            values.map(as_date32).collect::<Vec<_>>(),
        )),
        ScalarType::DateTime => Arc::new(TimestampMillisecondArray::from(
            values.map(as_timestamp_millis).collect::<Vec<_>>(),
        )),
    }
}

fn as_i64(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::Number(n) => n.as_i64(),
        Scalar::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) => n.as_f64(),
        Scalar::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Scalar) -> Option<bool> {
    match value {
        Scalar::Bool(b) => Some(*b),
        Scalar::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_date32(value: &Scalar) -> Option<i32> {
    let Scalar::String(text) = value else {
        return None;
    };
    let text = text.trim();
    // xs:date may carry a zone suffix ("2024-01-31Z", "2024-01-31+02:00")
    let date = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

fn as_timestamp_millis(value: &Scalar) -> Option<i64> {
    let Scalar::String(text) = value else {
        return None;
    };
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|parsed| parsed.and_utc().timestamp_millis())
}
