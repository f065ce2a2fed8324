//! JSON table documents.
//!
//! ```json
//! {"columns": [{"name": "id", "storage": "int64", "values": [1, 2, null]}]}
//! ```
//!
//! Each JSON value is read according to the column's storage class. `null`
//! is always the missing marker; float and numeric columns also accept the
//! string `"NaN"`.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as Json;
use tabload::{Column, LoadError, Result, StorageClass, Table, Value};

#[derive(Debug, Deserialize)]
struct TableDocument {
    columns: Vec<ColumnDocument>,
}

#[derive(Debug, Deserialize)]
struct ColumnDocument {
    name: String,
    storage: StorageClass,
    #[serde(default)]
    values: Vec<Json>,
}

/// Read a table document from `path` and name the table `table_name`.
pub fn read_table(path: &Path, table_name: &str) -> Result<Table> {
    let content = std::fs::read_to_string(path)?;
    parse_table(&content, table_name)
}

/// Parse a table document.
pub fn parse_table(content: &str, table_name: &str) -> Result<Table> {
    let doc: TableDocument = serde_json::from_str(content)?;

    let columns = doc
        .columns
        .into_iter()
        .map(|col| {
            let values = col
                .values
                .iter()
                .enumerate()
                .map(|(row, v)| {
                    read_value(col.storage, v).map_err(|message| LoadError::ValueCoercion {
                        column: col.name.clone(),
                        row,
                        message,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Column::new(col.name, col.storage, values))
        })
        .collect::<Result<Vec<_>>>()?;

    let table = Table::new(table_name, columns);
    table.validate()?;
    Ok(table)
}

fn read_value(storage: StorageClass, json: &Json) -> std::result::Result<Value, String> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    match storage {
        StorageClass::Int8
        | StorageClass::Int16
        | StorageClass::Int32
        | StorageClass::Int64
        | StorageClass::NullableInt => json
            .as_i64()
            .map(Value::Int)
            .or_else(|| json.as_u64().map(Value::UInt))
            .ok_or_else(|| format!("expected an integer, got {}", json)),
        StorageClass::UInt8
        | StorageClass::UInt16
        | StorageClass::UInt32
        | StorageClass::UInt64 => json
            .as_u64()
            .map(Value::UInt)
            .ok_or_else(|| format!("expected an unsigned integer, got {}", json)),
        StorageClass::Float32 | StorageClass::Float64 => float_value(json),
        StorageClass::Decimal => match json {
            Json::String(s) => Decimal::from_str(s)
                .map(Value::Decimal)
                .map_err(|e| format!("invalid decimal {:?}: {}", s, e)),
            Json::Number(n) => Decimal::from_str(&n.to_string())
                .map(Value::Decimal)
                .map_err(|e| format!("invalid decimal {}: {}", n, e)),
            other => Err(format!("expected a decimal, got {}", other)),
        },
        StorageClass::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("expected a boolean, got {}", json)),
        StorageClass::Date => expect_str(json)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string()))
            .map(Value::Date),
        StorageClass::DateTime => expect_str(json)
            .and_then(parse_naive_datetime)
            .map(Value::DateTime),
        StorageClass::DateTimeTz => expect_str(json)
            .and_then(|s| DateTime::parse_from_rfc3339(s).map_err(|e| e.to_string()))
            .map(Value::DateTimeTz),
        StorageClass::Interval => json
            .as_f64()
            .map(|secs| Value::Interval(TimeDelta::microseconds((secs * 1e6).round() as i64)))
            .ok_or_else(|| format!("expected seconds as a number, got {}", json)),
        StorageClass::Numeric => match json {
            Json::String(s) if s == "NaN" => Ok(Value::Float(f64::NAN)),
            _ => Ok(generic_value(json)),
        },
        StorageClass::Text | StorageClass::Category | StorageClass::Opaque => {
            Ok(generic_value(json))
        }
    }
}

fn float_value(json: &Json) -> std::result::Result<Value, String> {
    match json {
        Json::String(s) if s == "NaN" => Ok(Value::Float(f64::NAN)),
        _ => json
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| format!("expected a number, got {}", json)),
    }
}

fn expect_str(json: &Json) -> std::result::Result<&str, String> {
    json.as_str()
        .ok_or_else(|| format!("expected a string, got {}", json))
}

fn parse_naive_datetime(s: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| format!("invalid datetime {:?}: {}", s, e))
}

/// Value for columns that hold whatever they are given.
fn generic_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_u64().map(Value::UInt))
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(_) | Json::Object(_) => Value::Json(json.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_document() {
        let table = parse_table(
            r#"{"columns": [
                {"name": "id", "storage": "uint32", "values": [1, 2, 3]},
                {"name": "price", "storage": "float64", "values": [1.5, "NaN", null]},
                {"name": "seen", "storage": "datetime", "values": ["2024-01-02 03:04:05", null, "2024-01-02T00:00:00"]},
                {"name": "meta", "storage": "object", "values": [{"k": 1}, "x", 7]}
            ]}"#,
            "items",
        )
        .unwrap();

        assert_eq!(table.name, "items");
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.columns[0].values[2], Value::UInt(3));
        assert!(matches!(table.columns[1].values[1], Value::Float(f) if f.is_nan()));
        assert_eq!(table.columns[1].values[2], Value::Null);
        assert!(matches!(table.columns[2].values[0], Value::DateTime(_)));
        assert!(matches!(table.columns[3].values[0], Value::Json(_)));
        assert_eq!(table.columns[3].values[2], Value::Int(7));
    }

    #[test]
    fn test_bad_cell_names_column_and_row() {
        let err = parse_table(
            r#"{"columns": [{"name": "n", "storage": "int64", "values": [1, "two"]}]}"#,
            "t",
        )
        .unwrap_err();
        assert!(err.to_string().contains("column n at row 1"), "{}", err);
    }

    #[test]
    fn test_ragged_document_is_rejected() {
        let err = parse_table(
            r#"{"columns": [
                {"name": "a", "storage": "int64", "values": [1, 2]},
                {"name": "b", "storage": "int64", "values": [1]}
            ]}"#,
            "t",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidTable(_)));
    }

    #[test]
    fn test_interval_seconds() {
        assert_eq!(
            read_value(StorageClass::Interval, &serde_json::json!(90.5)),
            Ok(Value::Interval(TimeDelta::milliseconds(90_500)))
        );
    }

    #[test]
    fn test_decimal_from_string() {
        assert_eq!(
            read_value(StorageClass::Decimal, &serde_json::json!("12.50")),
            Ok(Value::Decimal(Decimal::new(1250, 2)))
        );
    }
}
