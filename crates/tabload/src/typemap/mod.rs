//! Type inference from a column's storage class and values to a MySQL type.
//!
//! Inference is a pure function of one [`Column`]. Rules are tried in order
//! and the first that claims the column decides its type:
//!
//! 1. fixed-width numeric, temporal and categorical classes map directly
//! 2. text columns are tiered by their longest value
//! 3. generic numeric columns get the narrowest integer type covering the
//!    observed range, or `DOUBLE` when any value has a fractional part
//!    (a declared integer class truncates fractions instead)
//! 4. everything else is `TEXT`

use rust_decimal::prelude::ToPrimitive;

use crate::core::schema::{Column, InferredSchema, StorageClass, Table};
use crate::core::value::Value;

/// Longest value stored as `VARCHAR(n)`.
pub const VARCHAR_MAX: usize = 255;
/// Longest value stored as `TEXT`.
pub const TEXT_MAX: usize = 65_535;
/// Longest value stored as `MEDIUMTEXT`.
pub const MEDIUMTEXT_MAX: usize = 16_777_215;

type Rule = fn(&Column) -> Option<String>;

/// Inference rules in priority order.
const RULES: &[(&str, Rule)] = &[
    ("fixed", fixed_type),
    ("text", text_type),
    ("numeric", numeric_type),
    ("fallback", fallback_type),
];

/// Infer the MySQL column type for one column.
pub fn infer_column_type(column: &Column) -> String {
    RULES
        .iter()
        .find_map(|(_, rule)| rule(column))
        .unwrap_or_else(|| "TEXT".to_string())
}

/// Infer types for every column of a table, in column order.
pub fn infer_schema(table: &Table) -> InferredSchema {
    let mut schema = InferredSchema::new();
    for column in &table.columns {
        schema.push(column.name.clone(), infer_column_type(column));
    }
    schema
}

/// Direct mapping for classes whose SQL type does not depend on the values.
fn fixed_type(column: &Column) -> Option<String> {
    let sql = match column.storage {
        StorageClass::Int8 => "TINYINT",
        StorageClass::Int16 => "SMALLINT",
        StorageClass::Int32 => "INT",
        StorageClass::Int64 => "BIGINT",
        StorageClass::UInt8 => "TINYINT UNSIGNED",
        StorageClass::UInt16 => "SMALLINT UNSIGNED",
        StorageClass::UInt32 => "INT UNSIGNED",
        StorageClass::UInt64 => "BIGINT UNSIGNED",
        StorageClass::Float32 => "FLOAT",
        StorageClass::Float64 => "DOUBLE",
        StorageClass::Decimal => "DECIMAL(65,30)",
        StorageClass::Bool => "BOOLEAN",
        StorageClass::Category => "VARCHAR(255)",
        StorageClass::Date => "DATE",
        StorageClass::DateTime | StorageClass::DateTimeTz => "DATETIME",
        StorageClass::Interval => "TIME",
        _ => return None,
    };
    Some(sql.to_string())
}

/// Tier text columns by the character length of their longest value.
fn text_type(column: &Column) -> Option<String> {
    if column.storage != StorageClass::Text {
        return None;
    }

    let max_length = column
        .present_values()
        .map(|v| match v {
            Value::Text(s) => s.chars().count(),
            other => other.to_text().chars().count(),
        })
        .max();

    let Some(max_length) = max_length else {
        return Some("TEXT".to_string());
    };

    Some(text_tier(max_length))
}

/// SQL text type for a longest value of `max_length` characters.
pub fn text_tier(max_length: usize) -> String {
    if max_length <= VARCHAR_MAX {
        format!("VARCHAR({})", max_length)
    } else if max_length <= TEXT_MAX {
        "TEXT".to_string()
    } else if max_length <= MEDIUMTEXT_MAX {
        "MEDIUMTEXT".to_string()
    } else {
        "LONGTEXT".to_string()
    }
}

/// Width selection for numeric columns without a fixed mapping.
fn numeric_type(column: &Column) -> Option<String> {
    if !matches!(
        column.storage,
        StorageClass::Numeric | StorageClass::NullableInt
    ) {
        return None;
    }

    // A declared integer class makes every finite value integral.
    let declared_integer = column.storage.is_integer();
    let mut range: Option<(i128, i128)> = None;
    for value in column.present_values() {
        let n = match integral_value(value, declared_integer) {
            Integral::Yes(n) => n,
            Integral::Fractional => return Some("DOUBLE".to_string()),
            Integral::NotNumeric => return None,
        };
        range = Some(match range {
            Some((min, max)) => (min.min(n), max.max(n)),
            None => (n, n),
        });
    }

    Some(match range {
        Some((min, max)) => integer_type(min, max).to_string(),
        None => "DOUBLE".to_string(),
    })
}

fn fallback_type(_column: &Column) -> Option<String> {
    Some("TEXT".to_string())
}

enum Integral {
    Yes(i128),
    Fractional,
    NotNumeric,
}

/// Classify a numeric value. Float-to-int conversion saturates, which keeps
/// huge magnitudes on the correct side of every threshold. With
/// `truncate`, fractional values are cut toward zero instead of rejected.
fn integral_value(value: &Value, truncate: bool) -> Integral {
    match value {
        Value::Float(f) if truncate && f.is_finite() => Integral::Yes(f.trunc() as i128),
        Value::Decimal(d) if truncate => {
            d.trunc().to_i128().map_or(Integral::Fractional, Integral::Yes)
        }
        Value::Int(i) => Integral::Yes(i128::from(*i)),
        Value::UInt(u) => Integral::Yes(i128::from(*u)),
        Value::Bool(b) => Integral::Yes(i128::from(*b)),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Integral::Yes(*f as i128),
        Value::Float(_) => Integral::Fractional,
        Value::Decimal(d) if d.fract().is_zero() => {
            d.trunc().to_i128().map_or(Integral::Fractional, Integral::Yes)
        }
        Value::Decimal(_) => Integral::Fractional,
        _ => Integral::NotNumeric,
    }
}

/// Narrowest MySQL integer type covering `[min, max]`.
pub fn integer_type(min: i128, max: i128) -> &'static str {
    if min >= 0 {
        if max <= 255 {
            "TINYINT UNSIGNED"
        } else if max <= 65_535 {
            "SMALLINT UNSIGNED"
        } else if max <= 4_294_967_295 {
            "INT UNSIGNED"
        } else {
            "BIGINT UNSIGNED"
        }
    } else if min >= -128 && max <= 127 {
        "TINYINT"
    } else if min >= -32_768 && max <= 32_767 {
        "SMALLINT"
    } else if min >= -2_147_483_648 && max <= 2_147_483_647 {
        "INT"
    } else {
        "BIGINT"
    }
}
