//! Per-cell value normalization into bind parameters.

use rust_decimal::prelude::ToPrimitive;

use crate::core::schema::{StorageClass, Table};
use crate::core::value::{Batch, Param, Value, DATETIME_FORMAT, DATE_FORMAT};
use crate::error::{LoadError, Result};

use super::batches::BatchSpan;

/// Normalize one cell of a column with the given storage class.
///
/// Missing values become NULL, temporal values become fixed-format text,
/// decimals become floats, and nested structures become JSON text. The error
/// string says why the value cannot be sent.
pub fn normalize_value(storage: StorageClass, value: &Value) -> std::result::Result<Param, String> {
    if storage.is_missing(value) {
        return Ok(Param::Null);
    }

    match value {
        Value::Null => Ok(Param::Null),
        Value::Bool(b) => Ok(Param::Bool(*b)),
        Value::Int(i) => Ok(Param::Int(*i)),
        Value::UInt(u) => Ok(Param::UInt(*u)),
        Value::Float(f) if f.is_finite() => Ok(Param::Float(*f)),
        Value::Float(f) => Err(format!("{} is not storable in a {:?} column", f, storage)),
        Value::Decimal(d) => d
            .to_f64()
            .map(Param::Float)
            .ok_or_else(|| format!("decimal {} has no floating-point approximation", d)),
        Value::Text(s) => Ok(Param::Text(s.clone())),
        Value::Date(d) => Ok(Param::Text(d.format(DATE_FORMAT).to_string())),
        Value::DateTime(dt) => Ok(Param::Text(dt.format(DATETIME_FORMAT).to_string())),
        // Wall-clock time in the value's own offset.
        Value::DateTimeTz(dt) => Ok(Param::Text(dt.format(DATETIME_FORMAT).to_string())),
        Value::Interval(td) => Ok(Param::Interval(*td)),
        Value::Json(j) => json_param(j),
    }
}

fn json_param(value: &serde_json::Value) -> std::result::Result<Param, String> {
    use serde_json::Value as Json;

    match value {
        Json::Null => Ok(Param::Null),
        Json::Bool(b) => Ok(Param::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Param::Int(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Param::UInt(u))
            } else {
                n.as_f64()
                    .map(Param::Float)
                    .ok_or_else(|| format!("number {} is not representable", n))
            }
        }
        Json::String(s) => Ok(Param::Text(s.clone())),
        Json::Array(_) | Json::Object(_) => serde_json::to_string(value)
            .map(Param::Text)
            .map_err(|e| e.to_string()),
    }
}

/// Normalize the rows of `span` into a batch, row-major.
pub fn build_batch(table: &Table, span: BatchSpan) -> Result<Batch> {
    let mut rows = Vec::with_capacity(span.len());
    for row in span.start..span.end {
        let mut params = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let param = normalize_value(column.storage, &column.values[row]).map_err(|message| {
                LoadError::ValueCoercion {
                    column: column.name.clone(),
                    row,
                    message,
                }
            })?;
            params.push(param);
        }
        rows.push(params);
    }

    Ok(Batch {
        index: span.index,
        start: span.start,
        rows,
    })
}
