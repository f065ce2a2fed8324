//! Cell values as supplied by the caller, and bind parameters as sent to the backend.
//!
//! [`Value`] is the heterogeneous cell representation of an in-memory table.
//! [`Param`] is the narrower, backend-ready representation produced by value
//! normalization; every row of a [`Batch`] is a vector of `Param`s.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;

/// Timestamp format used when a date-time is sent as text.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format used when a date is sent as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,

    Bool(bool),

    /// Signed integer of any declared width.
    Int(i64),

    /// Unsigned integer of any declared width.
    UInt(u64),

    /// Floating point of any declared width. NaN marks a missing value in
    /// float-backed columns.
    Float(f64),

    /// Arbitrary-precision decimal.
    Decimal(Decimal),

    Text(String),

    Date(NaiveDate),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeTz(DateTime<FixedOffset>),

    /// Elapsed time.
    Interval(TimeDelta),

    /// Nested structure (mapping or sequence).
    Json(serde_json::Value),
}

impl Value {
    /// Textual rendering used for length measurement of text columns.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            Value::DateTimeTz(dt) => dt.to_rfc3339(),
            Value::Interval(td) => format_interval(td),
            Value::Json(j) => j.to_string(),
        }
    }
}

/// Render an interval as `[-]HH:MM:SS[.ffffff]`, hours unbounded. The
/// fraction appears only for a non-zero microsecond part, as MySQL TIME does.
fn format_interval(td: &TimeDelta) -> String {
    let secs = td.num_seconds();
    let micros = td.subsec_nanos().unsigned_abs() / 1_000;
    let sign = if *td < TimeDelta::zero() { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let mut out = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );
    if micros != 0 {
        out.push_str(&format!(".{:06}", micros));
    }
    out
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTimeTz(v)
    }
}

impl From<TimeDelta> for Value {
    fn from(v: TimeDelta) -> Self {
        Value::Interval(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A normalized, bindable statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Interval(TimeDelta),
}

/// A contiguous slice of normalized rows, submitted and committed as one unit.
#[derive(Debug)]
pub struct Batch {
    /// 1-based position of this batch within the load.
    pub index: usize,

    /// Row offset of the first row in the source table.
    pub start: usize,

    /// Normalized rows.
    pub rows: Vec<Vec<Param>>,
}

/// Load progress, reported once per committed batch.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Progress {
    /// Number of batches committed so far.
    pub batches_done: usize,

    /// Total number of batches in the load.
    pub batches_total: usize,

    /// Rows committed so far.
    pub rows_done: usize,

    /// Total rows in the load.
    pub rows_total: usize,

    /// Fraction of rows submitted, in `[0, 1]`.
    pub fraction: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_text_lengths() {
        assert_eq!(Value::Float(3.0).to_text(), "3.0");
        assert_eq!(Value::Bool(false).to_text(), "false");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).to_text(),
            "2024-02-29"
        );
        assert_eq!(
            Value::Interval(TimeDelta::seconds(-3725)).to_text(),
            "-01:02:05"
        );
        assert_eq!(
            Value::Interval(TimeDelta::milliseconds(90_250)).to_text(),
            "00:01:30.250000"
        );
        assert_eq!(
            Value::Interval(-TimeDelta::milliseconds(500)).to_text(),
            "-00:00:00.500000"
        );
    }

    #[test]
    fn test_option_into_value() {
        let v: Value = Some(5i64).into();
        assert_eq!(v, Value::Int(5));
        let v: Value = Option::<&str>::None.into();
        assert_eq!(v, Value::Null);
    }
}
