//! MySQL/MariaDB target session.
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod session;

pub use session::MysqlSession;
