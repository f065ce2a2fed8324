//! Session implementations.
//!
//! - [`mysql`]: live MySQL/MariaDB connection
//! - [`recording`]: in-memory session for dry runs and tests

pub mod mysql;
pub mod recording;

pub use mysql::MysqlSession;
pub use recording::{RecordingSession, Statement};
