//! In-memory session that records statements instead of executing them.
//!
//! Used for dry runs (print what a load would send) and as the session in
//! loader tests. It tracks transactions like a real backend: statements are
//! pending until `commit`, and `rollback` discards them. Failures can be
//! injected per commit or per statement text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::core::traits::Session;
use crate::core::value::Param;
use crate::error::{LoadError, Result};

/// One executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
    /// Placeholder tuples in an INSERT, 0 for other statements.
    pub rows: usize,
}

/// Session that keeps everything in memory.
#[derive(Debug, Default)]
pub struct RecordingSession {
    log: Vec<String>,
    pending: Vec<Statement>,
    committed: Vec<Statement>,
    tables: BTreeMap<String, Vec<String>>,
    commits: usize,
    rollbacks: usize,
    fail_commit_at: Option<usize>,
    fail_pattern: Option<String>,
    closed: bool,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th commit attempt (1-based) fail, once.
    pub fn fail_commit_at(mut self, n: usize) -> Self {
        self.fail_commit_at = Some(n);
        self
    }

    /// Make every statement whose text contains `pattern` fail.
    pub fn fail_statements_containing(mut self, pattern: impl Into<String>) -> Self {
        self.fail_pattern = Some(pattern.into());
        self
    }

    /// Simulate the connection being torn down; every later call fails.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Every statement text received, in order, including failed ones.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Statements that were committed, in order.
    pub fn committed(&self) -> &[Statement] {
        &self.committed
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Names of tables created so far.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Column names of a created table.
    pub fn table_columns(&self, table: &str) -> Option<Vec<&str>> {
        self.tables
            .get(table)
            .map(|cols| cols.iter().map(String::as_str).collect())
    }

    /// Rows committed into `table`.
    pub fn committed_rows(&self, table: &str) -> usize {
        let prefix = format!("INSERT INTO {} ", table);
        self.committed
            .iter()
            .filter(|s| s.sql.starts_with(&prefix))
            .map(|s| s.rows)
            .sum()
    }

    fn check_alive(&self) -> Result<()> {
        if self.closed {
            return Err(LoadError::Backend(
                "Lost connection to MySQL server during query".to_string(),
            ));
        }
        Ok(())
    }

    fn record(&mut self, sql: &str, params: Vec<Param>) -> Result<()> {
        self.log.push(sql.to_string());
        self.check_alive()?;

        if let Some(pattern) = &self.fail_pattern {
            if sql.contains(pattern.as_str()) {
                return Err(LoadError::Backend(format!(
                    "statement rejected (matched {:?})",
                    pattern
                )));
            }
        }

        let mut rows = 0;
        if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            let (name, columns) = parse_create(rest);
            self.tables.entry(name).or_insert(columns);
        } else if let Some(rest) = sql.strip_prefix("CREATE TABLE ") {
            let (name, columns) = parse_create(rest);
            if self.tables.contains_key(&name) {
                return Err(LoadError::Backend(format!(
                    "Table '{}' already exists",
                    name
                )));
            }
            self.tables.insert(name, columns);
        } else if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let name = rest.split_whitespace().next().unwrap_or_default();
            if !self.tables.contains_key(name) {
                return Err(LoadError::Backend(format!("Table '{}' doesn't exist", name)));
            }
            rows = sql.matches("(?").count();
            let expected = sql.matches('?').count();
            if params.len() != expected {
                return Err(LoadError::Backend(format!(
                    "Incorrect arguments to mysqld_stmt_execute: {} placeholders, {} params",
                    expected,
                    params.len()
                )));
            }
        }

        self.pending.push(Statement {
            sql: sql.to_string(),
            params,
            rows,
        });
        Ok(())
    }
}

/// Split `name (\n    col TYPE, col TYPE\n) OPTIONS` into the name and column names.
fn parse_create(rest: &str) -> (String, Vec<String>) {
    let name = rest.split_whitespace().next().unwrap_or_default().to_string();
    let body = rest
        .find('(')
        .zip(rest.rfind(')'))
        .filter(|(open, close)| open < close)
        .map(|(open, close)| &rest[open + 1..close])
        .unwrap_or_default();
    let columns = body
        .split(", ")
        .filter_map(|def| def.split_whitespace().next())
        .map(str::to_string)
        .collect();
    (name, columns)
}

#[async_trait]
impl Session for RecordingSession {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.record(sql, Vec::new())
    }

    async fn execute_with_params(&mut self, sql: &str, params: Vec<Param>) -> Result<()> {
        self.record(sql, params)
    }

    async fn commit(&mut self) -> Result<()> {
        self.log.push("COMMIT".to_string());
        self.check_alive()?;

        if self.fail_commit_at == Some(self.commits + 1) {
            self.fail_commit_at = None;
            return Err(LoadError::Backend(
                "Deadlock found when trying to get lock; try restarting transaction".to_string(),
            ));
        }

        self.commits += 1;
        debug!("Recording session committed {} statements", self.pending.len());
        self.committed.append(&mut self.pending);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.log.push("ROLLBACK".to_string());
        self.check_alive()?;
        self.rollbacks += 1;
        self.pending.clear();
        Ok(())
    }

    fn db_type(&self) -> &str {
        "recording"
    }
}
