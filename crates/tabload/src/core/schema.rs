//! Table, column and inferred-schema types.
//!
//! A [`Table`] is what the ingestion side hands us: ordered, equally long
//! columns, each tagged with the [`StorageClass`] its values were read as.
//! [`InferredSchema`] is what the inference engine hands back.

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::error::{LoadError, Result};

/// Semantic kind of a column's values before SQL type inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    #[serde(rename = "uint32")]
    UInt32,
    #[serde(rename = "uint64")]
    UInt64,
    Float32,
    Float64,
    /// Arbitrary-precision decimal.
    Decimal,
    #[serde(alias = "boolean")]
    Bool,
    /// Generic text or mixed objects (including nested mappings/sequences).
    #[serde(alias = "object", alias = "string")]
    Text,
    /// Bounded set of labels.
    Category,
    Date,
    #[serde(rename = "datetime", alias = "timestamp")]
    DateTime,
    #[serde(rename = "datetime_tz")]
    DateTimeTz,
    /// Elapsed time.
    #[serde(alias = "timedelta")]
    Interval,
    /// Nullable integer whose SQL width is decided by the observed values.
    NullableInt,
    /// Numeric column without a fixed width mapping (e.g. half floats).
    Numeric,
    /// Anything the engine has no rule for.
    Opaque,
}

impl StorageClass {
    /// Whether `value` counts as missing for this storage class.
    ///
    /// Float-backed and object-backed classes use NaN as a missing marker;
    /// integer, boolean and temporal classes only treat `Null` as missing.
    pub fn is_missing(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Float(f) if f.is_nan() => matches!(
                self,
                StorageClass::Float32
                    | StorageClass::Float64
                    | StorageClass::NullableInt
                    | StorageClass::Numeric
                    | StorageClass::Text
                    | StorageClass::Category
                    | StorageClass::Opaque
            ),
            _ => false,
        }
    }

    /// True for classes whose values are all integers by declaration.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            StorageClass::Int8
                | StorageClass::Int16
                | StorageClass::Int32
                | StorageClass::Int64
                | StorageClass::UInt8
                | StorageClass::UInt16
                | StorageClass::UInt32
                | StorageClass::UInt64
                | StorageClass::NullableInt
        )
    }
}

/// A named, typed column of nullable values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column identifier (normalized in place before table creation).
    pub name: String,

    /// Declared storage class.
    pub storage: StorageClass,

    /// Values in row order.
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, storage: StorageClass, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            storage,
            values,
        }
    }

    /// Iterate over values that are not missing for this column's storage class.
    pub fn present_values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(move |v| !self.storage.is_missing(v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An in-memory table bound for a target table name.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Target table name supplied by the caller.
    pub name: String,

    /// Columns in table order.
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Number of rows (length of the first column, 0 for a table without columns).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Column identifiers in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Check that every column has the same number of values.
    pub fn validate(&self) -> Result<()> {
        let rows = self.row_count();
        if let Some(col) = self.columns.iter().find(|c| c.len() != rows) {
            return Err(LoadError::InvalidTable(format!(
                "column '{}' has {} values, expected {}",
                col.name,
                col.len(),
                rows
            )));
        }
        Ok(())
    }
}

/// One resolved column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub name: String,
    pub sql_type: String,
}

/// Ordered mapping from column identifier to SQL type.
///
/// Order follows the table's column order and drives `CREATE TABLE` column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InferredSchema {
    columns: Vec<ColumnType>,
}

impl InferredSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, sql_type: impl Into<String>) {
        self.columns.push(ColumnType {
            name: name.into(),
            sql_type: sql_type.into(),
        });
    }

    /// SQL type for a column, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.sql_type.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnType> {
        self.columns.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
