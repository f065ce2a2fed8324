//! Session over a single `mysql_async` connection.
//!
//! Autocommit is disabled on connect, so every statement belongs to the
//! open transaction until `commit` or `rollback`.

use async_trait::async_trait;
use chrono::TimeDelta;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, SslOpts};
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::core::traits::Session;
use crate::core::value::Param;
use crate::error::{LoadError, Result};

/// MySQL session bound to one connection.
pub struct MysqlSession {
    conn: Conn,
}

impl MysqlSession {
    /// Open a connection and check it with `SELECT 1`.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let opts = connect_opts(config);
        let mut conn = Conn::new(opts)
            .await
            .map_err(|e| LoadError::Connection(e.to_string()))?;

        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| LoadError::Connection(e.to_string()))?;

        info!("Connected to MySQL target: {}", config.display_target());

        Ok(Self { conn })
    }

    /// Server version as reported by the handshake.
    pub fn server_version(&self) -> String {
        let (major, minor, patch) = self.conn.server_version();
        format!("{}.{}.{}", major, minor, patch)
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> Result<()> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl Session for MysqlSession {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn.query_drop(sql).await?;
        Ok(())
    }

    async fn execute_with_params(&mut self, sql: &str, params: Vec<Param>) -> Result<()> {
        debug!("Executing statement with {} parameters", params.len());
        let values: Vec<mysql_async::Value> = params.iter().map(param_to_mysql).collect();
        self.conn.exec_drop(sql, values).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn.query_drop("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.conn.query_drop("ROLLBACK").await?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mysql"
    }
}

/// Statements run on every new connection.
///
/// `Conn::start_transaction` hands back a guard that borrows the connection,
/// which cannot outlive a single `Session` call. Transactions are instead
/// driven by autocommit off plus explicit `COMMIT` and `ROLLBACK`.
const SESSION_INIT: [&str; 2] = ["SET NAMES utf8mb4", "SET autocommit=0"];

fn connect_opts(config: &TargetConfig) -> Opts {
    let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
        "disable" => {
            warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
            None
        }
        "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
        "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => Some(SslOpts::default()),
        other => {
            warn!("Unknown ssl_mode '{}', defaulting to prefer", other);
            Some(SslOpts::default().with_danger_accept_invalid_certs(true))
        }
    };

    let mut builder = OptsBuilder::default()
        .ip_or_hostname(&config.host)
        .tcp_port(config.port)
        .db_name(Some(&config.database))
        .user(Some(&config.user))
        .pass(Some(&config.password))
        .init(SESSION_INIT.to_vec());

    if let Some(ssl) = ssl_opts {
        builder = builder.ssl_opts(ssl);
    }

    builder.into()
}

/// Convert a bind parameter to the driver's value type.
fn param_to_mysql(param: &Param) -> mysql_async::Value {
    match param {
        Param::Null => mysql_async::Value::NULL,
        Param::Bool(b) => mysql_async::Value::from(*b),
        Param::Int(i) => mysql_async::Value::from(*i),
        Param::UInt(u) => mysql_async::Value::from(*u),
        Param::Float(f) => mysql_async::Value::from(*f),
        Param::Text(s) => mysql_async::Value::from(s.as_str()),
        Param::Interval(td) => interval_to_time(*td),
    }
}

/// TIME value `(negative, days, hours, minutes, seconds, micros)`.
fn interval_to_time(td: TimeDelta) -> mysql_async::Value {
    let negative = td < TimeDelta::zero();
    let td = td.abs();
    let total_secs = td.num_seconds();
    let micros = td.subsec_nanos().unsigned_abs() / 1_000;

    let days = (total_secs / 86_400) as u32;
    let hours = ((total_secs % 86_400) / 3_600) as u8;
    let minutes = ((total_secs % 3_600) / 60) as u8;
    let seconds = (total_secs % 60) as u8;

    mysql_async::Value::Time(negative, days, hours, minutes, seconds, micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::Value;

    fn target(ssl_mode: &str) -> TargetConfig {
        TargetConfig {
            r#type: "mysql".to_string(),
            host: "db.local".to_string(),
            port: 3307,
            database: "sales".to_string(),
            user: "etl".to_string(),
            password: "secret".to_string(),
            ssl_mode: ssl_mode.to_string(),
        }
    }

    #[test]
    fn test_connect_opts_disable_autocommit() {
        let opts = connect_opts(&target("prefer"));
        assert_eq!(opts.init(), ["SET NAMES utf8mb4", "SET autocommit=0"]);
        assert_eq!(opts.ip_or_hostname(), "db.local");
        assert_eq!(opts.tcp_port(), 3307);
        assert_eq!(opts.db_name(), Some("sales"));
        assert!(opts.ssl_opts().is_some());
    }

    #[test]
    fn test_connect_opts_ssl_disabled() {
        assert!(connect_opts(&target("disable")).ssl_opts().is_none());
        assert!(connect_opts(&target("verify-full")).ssl_opts().is_some());
    }

    #[test]
    fn test_param_conversion() {
        assert_eq!(param_to_mysql(&Param::Null), Value::NULL);
        assert_eq!(param_to_mysql(&Param::Int(-3)), Value::Int(-3));
        assert_eq!(param_to_mysql(&Param::UInt(7)), Value::UInt(7));
        assert_eq!(param_to_mysql(&Param::Float(1.5)), Value::Double(1.5));
        assert_eq!(
            param_to_mysql(&Param::Text("hé".to_string())),
            Value::Bytes("hé".as_bytes().to_vec())
        );
    }

    #[test]
    fn test_interval_to_time() {
        let td = TimeDelta::days(1) + TimeDelta::hours(2) + TimeDelta::seconds(5);
        assert_eq!(interval_to_time(td), Value::Time(false, 1, 2, 0, 5, 0));

        let neg = -(TimeDelta::minutes(90) + TimeDelta::milliseconds(250));
        assert_eq!(interval_to_time(neg), Value::Time(true, 0, 1, 30, 0, 250_000));
    }
}
