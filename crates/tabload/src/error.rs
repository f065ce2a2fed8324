//! Error types for the loading library.

use thiserror::Error;

/// Main error type for inference and load operations.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend unreachable or credentials rejected
    #[error("Connection error: {0}")]
    Connection(String),

    /// Raw backend error from a session call, before phase attribution
    #[error("Backend error: {0}")]
    Backend(String),

    /// CREATE TABLE rejected by the backend
    #[error("Table creation failed for {table}: {message}")]
    Schema { table: String, message: String },

    /// A batch failed to submit or commit
    #[error("Insert failed for {table} (batch {batch}): {message}")]
    BatchInsert {
        table: String,
        batch: usize,
        message: String,
    },

    /// A cell could not be turned into a bindable parameter
    #[error("Cannot coerce value in column {column} at row {row}: {message}")]
    ValueCoercion {
        column: String,
        row: usize,
        message: String,
    },

    /// The table handed to the loader is malformed (ragged columns, bad name)
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<mysql_async::Error> for LoadError {
    fn from(e: mysql_async::Error) -> Self {
        LoadError::Backend(e.to_string())
    }
}

impl LoadError {
    /// Create a Schema error for a target table
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        LoadError::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a BatchInsert error (batches are numbered from 1)
    pub fn batch_insert(table: impl Into<String>, batch: usize, message: impl Into<String>) -> Self {
        LoadError::BatchInsert {
            table: table.into(),
            batch,
            message: message.into(),
        }
    }

    /// Text of the underlying failure without the phase prefix.
    pub fn backend_message(&self) -> String {
        match self {
            LoadError::Connection(m) | LoadError::Backend(m) => m.clone(),
            LoadError::Schema { message, .. } | LoadError::BatchInsert { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::Config(_) | LoadError::Yaml(_) => 1,
            LoadError::Connection(_) => 2,
            LoadError::Schema { .. } => 3,
            LoadError::BatchInsert { .. } | LoadError::ValueCoercion { .. } => 4,
            LoadError::Backend(_) => 4,
            LoadError::InvalidTable(_) | LoadError::Json(_) => 5,
            LoadError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for load operations.
pub type Result<T> = std::result::Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_phase() {
        assert_eq!(LoadError::Config("x".into()).exit_code(), 1);
        assert_eq!(LoadError::Connection("refused".into()).exit_code(), 2);
        assert_eq!(LoadError::schema("t", "bad").exit_code(), 3);
        assert_eq!(LoadError::batch_insert("t", 2, "lost").exit_code(), 4);
    }

    #[test]
    fn test_backend_message_strips_phase() {
        let err = LoadError::batch_insert("orders", 2, "Lock wait timeout exceeded");
        assert_eq!(err.backend_message(), "Lock wait timeout exceeded");
        assert_eq!(
            err.to_string(),
            "Insert failed for orders (batch 2): Lock wait timeout exceeded"
        );
    }
}
