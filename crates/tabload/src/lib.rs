//! # tabload
//!
//! Load in-memory tabular data into MySQL tables.
//!
//! Given a [`Table`] of named, typed columns, this library:
//!
//! - **Infers a MySQL column type** for every column from its storage class
//!   and observed values (narrowest integer width, text tier by length)
//! - **Creates the target table** idempotently with `CREATE TABLE IF NOT EXISTS`
//! - **Inserts rows in committed batches** of parameterized multi-row
//!   `INSERT` statements, reporting progress after each batch
//!
//! ## Example
//!
//! ```rust,no_run
//! use tabload::{Column, Config, Loader, MysqlSession, StorageClass, Table, Value};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let mut session = MysqlSession::connect(&config.target).await?;
//!
//!     let mut table = Table::new(
//!         "events",
//!         vec![Column::new("id", StorageClass::Int64, vec![Value::Int(1), Value::Int(2)])],
//!     );
//!     let mut report = |p: tabload::Progress| println!("{:.0}%", p.fraction * 100.0);
//!     let outcome = Loader::new(config.load)
//!         .load(&mut session, &mut table, &mut report)
//!         .await;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod loader;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, LoadConfig, TargetConfig};
pub use core::{
    channel_sink, no_progress, Column, ColumnType, InferredSchema, Param, Progress, ProgressSink,
    Session, StorageClass, Table, Value,
};
pub use drivers::{MysqlSession, RecordingSession};
pub use error::{LoadError, Result};
pub use loader::{LoadOutcome, LoadPhase, Loader};
pub use typemap::{infer_column_type, infer_schema};
