//! Identifier normalization and validation.
//!
//! Identifiers cannot be bound as statement parameters, so the DDL and DML
//! built by the loader splice them into SQL text unquoted. Column names are
//! normalized to word characters before that happens; the caller-supplied
//! table name is validated instead, since rewriting it would silently load
//! into a different table than the one requested.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{LoadError, Result};

/// MySQL identifier length limit.
const MAX_IDENTIFIER_LENGTH: usize = 64;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("static regex is valid"));

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+(\.\w+)?$").expect("static regex is valid"));

/// Normalize a column name: lowercase, then collapse every run of non-word
/// characters into a single underscore.
///
/// Uniqueness is not enforced: `"a b"` and `"a-b"` both become `"a_b"`.
///
/// # Examples
///
/// ```
/// use tabload::core::identifier::normalize_column_name;
///
/// assert_eq!(normalize_column_name("Order ID#"), "order_id_");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    NON_WORD
        .replace_all(&name.to_lowercase(), "_")
        .into_owned()
}

/// Validate a target table name, optionally qualified as `database.table`.
///
/// Rejects empty names, anything outside word characters, and parts longer
/// than MySQL allows.
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LoadError::InvalidTable(
            "table name cannot be empty".to_string(),
        ));
    }

    if !TABLE_NAME.is_match(name) {
        return Err(LoadError::InvalidTable(format!(
            "table name must be word characters with an optional database prefix, got {:?}",
            name
        )));
    }

    if let Some(part) = name.split('.').find(|p| p.len() > MAX_IDENTIFIER_LENGTH) {
        return Err(LoadError::InvalidTable(format!(
            "identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            part.len(),
            part
        )));
    }

    Ok(())
}

/// Validate a normalized column name.
pub fn validate_column_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LoadError::InvalidTable(
            "column name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(LoadError::InvalidTable(format!(
            "column name exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }
    Ok(())
}
