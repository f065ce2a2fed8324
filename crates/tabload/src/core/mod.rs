//! Core abstractions shared by the inference engine and the loader.
//!
//! - [`schema`]: storage classes, columns, tables and the inferred schema
//! - [`value`]: cell values, bind parameters, batches and progress
//! - [`identifier`]: column name normalization and table name validation
//! - [`traits`]: the database session and progress sink seams

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{Column, ColumnType, InferredSchema, StorageClass, Table};
pub use traits::{channel_sink, no_progress, ProgressSink, Session};
pub use value::{Batch, Param, Progress, Value};
