//! Schema creation and batched loading of a [`Table`] through a [`Session`].
//!
//! A load runs `Idle → SchemaCreated → Inserting(batch i of n) → Committed`,
//! or stops in `Failed` after schema creation or any batch. Each batch is
//! committed on its own: when batch `i` fails, batches `1..i` stay in the
//! target and batch `i + 1` is never attempted. There is no retry and no
//! resume; a failed load is restarted from the beginning by the caller.

mod batches;
mod normalize;
mod statements;

pub use batches::{BatchPlan, BatchSpan, DEFAULT_BATCH_SIZE};
pub use normalize::{build_batch, normalize_value};
pub use statements::{
    create_table_sql, insert_sql, rows_per_statement, MYSQL_MAX_PLACEHOLDERS, TABLE_OPTIONS,
};

use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::LoadConfig;
use crate::core::identifier::{normalize_column_name, validate_column_name, validate_table_name};
use crate::core::schema::{InferredSchema, Table};
use crate::core::traits::{ProgressSink, Session};
use crate::core::value::Batch;
use crate::error::{LoadError, Result};
use crate::typemap::infer_schema;

/// Phase of a load, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Connect,
    CreateTable,
    Insert,
}

impl LoadPhase {
    /// Process exit code for a load that failed in this phase.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadPhase::Connect => 2,
            LoadPhase::CreateTable => 3,
            LoadPhase::Insert => 4,
        }
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoadPhase::Connect => "Connection",
            LoadPhase::CreateTable => "Table Creation",
            LoadPhase::Insert => "Data Insertion",
        };
        f.write_str(label)
    }
}

/// Terminal result of a load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Every batch was committed.
    Loaded {
        table: String,
        rows: u64,
        schema: InferredSchema,
    },

    /// The load stopped at `phase`. `rows_committed` rows from earlier
    /// batches remain in the target.
    Failed {
        phase: LoadPhase,
        message: String,
        rows_committed: u64,
    },
}

impl LoadOutcome {
    /// Build a failure outcome with a `"<Phase> Error: <backend text>"` message.
    pub fn failed(phase: LoadPhase, err: &LoadError, rows_committed: u64) -> Self {
        LoadOutcome::Failed {
            phase,
            message: format!("{} Error: {}", phase, err.backend_message()),
            rows_committed,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    /// Rows loaded, for a successful load.
    pub fn rows(&self) -> Option<u64> {
        match self {
            LoadOutcome::Loaded { rows, .. } => Some(*rows),
            LoadOutcome::Failed { .. } => None,
        }
    }

    /// Diagnostic message, for a failed load.
    pub fn message(&self) -> Option<&str> {
        match self {
            LoadOutcome::Loaded { .. } => None,
            LoadOutcome::Failed { message, .. } => Some(message),
        }
    }
}

/// Creates target tables and loads rows in committed batches.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoadConfig,
}

impl Loader {
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    /// Rows per batch.
    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Validate the table, normalize its column names in place and infer its schema.
    ///
    /// Performs no I/O; the result is what [`create_table`](Self::create_table)
    /// would create.
    pub fn prepare(&self, table: &mut Table) -> Result<InferredSchema> {
        validate_table_name(&table.name)?;
        table.validate()?;

        for column in &mut table.columns {
            column.name = normalize_column_name(&column.name);
            validate_column_name(&column.name)?;
        }

        Ok(infer_schema(table))
    }

    /// Create the target table if it does not exist.
    ///
    /// Column names are normalized in place first, so a following
    /// [`insert_data`](Self::insert_data) uses the same identifiers.
    pub async fn create_table(
        &self,
        session: &mut dyn Session,
        table: &mut Table,
    ) -> Result<InferredSchema> {
        let schema = self.prepare(table)?;
        let ddl = create_table_sql(&table.name, &schema);
        debug!("Creating table {}: {}", table.name, ddl);

        session
            .execute(&ddl)
            .await
            .map_err(|e| LoadError::schema(&table.name, e.backend_message()))?;
        session
            .commit()
            .await
            .map_err(|e| LoadError::schema(&table.name, e.backend_message()))?;

        info!(
            "Created table {} ({} columns) on {}",
            table.name,
            schema.len(),
            session.db_type()
        );
        Ok(schema)
    }

    /// Insert every row in batches, committing and reporting progress after each.
    ///
    /// Returns the number of rows inserted. On the first failing batch the
    /// batch's uncommitted work is rolled back and the error returned;
    /// earlier batches stay committed.
    pub async fn insert_data(
        &self,
        session: &mut dyn Session,
        table: &Table,
        progress: &mut dyn ProgressSink,
    ) -> Result<u64> {
        table.validate()?;

        let plan = BatchPlan::new(table.row_count(), self.config.batch_size);
        let columns = table.column_names();
        let rows_per_stmt = rows_per_statement(columns.len(), self.config.max_placeholders);
        let batch_count = plan.len();

        for span in plan.spans() {
            let batch = build_batch(table, span)
                .map_err(|e| LoadError::batch_insert(&table.name, span.index, e.to_string()))?;

            if let Err(e) = self
                .write_batch(session, &table.name, &columns, &batch, rows_per_stmt)
                .await
            {
                if let Err(rb) = session.rollback().await {
                    warn!(
                        "Rollback of batch {} on {} failed: {}",
                        span.index, table.name, rb
                    );
                }
                return Err(LoadError::batch_insert(
                    &table.name,
                    span.index,
                    e.backend_message(),
                ));
            }

            let p = plan.progress_after(span);
            debug!(
                "Committed batch {}/{} of {} ({} rows, {:.1}%)",
                span.index,
                batch_count,
                table.name,
                span.len(),
                p.fraction * 100.0
            );
            progress.report(p);
        }

        if plan.is_empty() {
            progress.report(plan.complete());
        }

        Ok(table.row_count() as u64)
    }

    /// Submit one batch (split only to stay under the placeholder limit) and commit it.
    async fn write_batch(
        &self,
        session: &mut dyn Session,
        table: &str,
        columns: &[String],
        batch: &Batch,
        rows_per_stmt: usize,
    ) -> Result<()> {
        debug!(
            "Submitting batch {} of {} (rows {}..{})",
            batch.index,
            table,
            batch.start,
            batch.start + batch.rows.len()
        );
        for chunk in batch.rows.chunks(rows_per_stmt) {
            let sql = insert_sql(table, columns, chunk.len());
            let params = chunk.iter().flatten().cloned().collect();
            session.execute_with_params(&sql, params).await?;
        }
        session.commit().await
    }

    /// Create the table and load every row, converting any failure into a
    /// phase-tagged [`LoadOutcome::Failed`].
    pub async fn load(
        &self,
        session: &mut dyn Session,
        table: &mut Table,
        progress: &mut dyn ProgressSink,
    ) -> LoadOutcome {
        let schema = match self.create_table(session, table).await {
            Ok(schema) => schema,
            Err(e) => {
                error!("Table creation failed for {}: {}", table.name, e);
                return LoadOutcome::failed(LoadPhase::CreateTable, &e, 0);
            }
        };

        match self.insert_data(session, table, progress).await {
            Ok(rows) => {
                info!("Loaded {} rows into {}", rows, table.name);
                LoadOutcome::Loaded {
                    table: table.name.clone(),
                    rows,
                    schema,
                }
            }
            Err(e) => {
                error!("Data insertion failed for {}: {}", table.name, e);
                let rows_committed = self.rows_committed_before(&e, table.row_count());
                LoadOutcome::failed(LoadPhase::Insert, &e, rows_committed)
            }
        }
    }

    fn rows_committed_before(&self, err: &LoadError, total_rows: usize) -> u64 {
        match err {
            LoadError::BatchInsert { batch, .. } => {
                let committed = batch.saturating_sub(1) * self.config.batch_size.max(1);
                committed.min(total_rows) as u64
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, StorageClass};
    use crate::core::traits::no_progress;
    use crate::core::value::{Param, Progress, Value};
    use crate::drivers::RecordingSession;

    fn loader(batch_size: usize) -> Loader {
        Loader::new(LoadConfig {
            batch_size,
            ..LoadConfig::default()
        })
    }

    fn id_table(name: &str, rows: usize) -> Table {
        Table::new(
            name,
            vec![
                Column::new(
                    "ID",
                    StorageClass::Int64,
                    (0..rows as i64).map(Value::Int).collect(),
                ),
                Column::new(
                    "Label",
                    StorageClass::Text,
                    (0..rows).map(|i| Value::Text(format!("row {}", i))).collect(),
                ),
            ],
        )
    }

    #[tokio::test]
    async fn test_load_2500_rows_reports_three_batches() {
        let mut session = RecordingSession::new();
        let mut table = id_table("events", 2500);
        let mut fractions = Vec::new();
        let mut sink = |p: Progress| fractions.push(p.fraction);

        let outcome = loader(1000).load(&mut session, &mut table, &mut sink).await;

        assert_eq!(outcome.rows(), Some(2500));
        assert_eq!(fractions, [0.4, 0.8, 1.0]);
        assert_eq!(session.committed_rows("events"), 2500);
        let inserts: Vec<usize> = session
            .committed()
            .iter()
            .filter(|s| s.sql.starts_with("INSERT"))
            .map(|s| s.rows)
            .collect();
        assert_eq!(inserts, [1000, 1000, 500]);
    }

    #[tokio::test]
    async fn test_rows_arrive_in_order_exactly_once() {
        let mut session = RecordingSession::new();
        let mut table = id_table("t", 23);
        let outcome = loader(5).load(&mut session, &mut table, &mut no_progress()).await;
        assert!(outcome.is_success());

        let ids: Vec<i64> = session
            .committed()
            .iter()
            .filter(|s| s.sql.starts_with("INSERT"))
            .flat_map(|s| s.params.iter().step_by(2))
            .map(|p| match p {
                Param::Int(i) => *i,
                other => panic!("unexpected param {:?}", other),
            })
            .collect();
        assert_eq!(ids, (0..23).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_column_names_normalized_for_ddl_and_insert() {
        let mut session = RecordingSession::new();
        let mut table = Table::new(
            "orders",
            vec![Column::new(
                "Order ID#",
                StorageClass::Numeric,
                vec![Value::Int(3), Value::Int(7)],
            )],
        );

        let outcome = loader(1000)
            .load(&mut session, &mut table, &mut no_progress())
            .await;

        assert!(outcome.is_success());
        assert_eq!(table.columns[0].name, "order_id_");
        let sql: Vec<&str> = session.committed().iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            [
                "CREATE TABLE IF NOT EXISTS orders (\n    order_id_ TINYINT UNSIGNED\n) \
                 ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
                "INSERT INTO orders (order_id_) VALUES (?), (?)",
            ]
        );
    }

    #[tokio::test]
    async fn test_create_table_twice_is_idempotent() {
        let mut session = RecordingSession::new();
        let loader = loader(1000);

        let mut first = id_table("t", 1);
        let schema_a = loader.create_table(&mut session, &mut first).await.unwrap();
        let mut second = id_table("t", 1);
        let schema_b = loader.create_table(&mut session, &mut second).await.unwrap();

        assert_eq!(schema_a, schema_b);
        assert_eq!(session.table_names(), ["t"]);
        assert_eq!(session.table_columns("t"), Some(vec!["id", "label"]));
    }

    #[tokio::test]
    async fn test_second_commit_failure_keeps_first_batch() {
        // Commit 1 is the CREATE TABLE, commit 3 is the second batch.
        let mut session = RecordingSession::new().fail_commit_at(3);
        let mut table = id_table("t", 2500);
        let mut fractions = Vec::new();
        let mut sink = |p: Progress| fractions.push(p.fraction);

        let outcome = loader(1000).load(&mut session, &mut table, &mut sink).await;

        match &outcome {
            LoadOutcome::Failed {
                phase,
                message,
                rows_committed,
            } => {
                assert_eq!(*phase, LoadPhase::Insert);
                assert!(message.starts_with("Data Insertion Error: "), "{}", message);
                assert_eq!(*rows_committed, 1000);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(session.committed_rows("t"), 1000);
        assert_eq!(fractions, [0.4]);
        assert_eq!(session.rollbacks(), 1);
        let insert_attempts = session
            .log()
            .iter()
            .filter(|s| s.starts_with("INSERT"))
            .count();
        assert_eq!(insert_attempts, 2, "batch three must never be attempted");
    }

    #[tokio::test]
    async fn test_schema_failure_attempts_no_batches() {
        let mut session = RecordingSession::new().fail_statements_containing("CREATE TABLE");
        let mut table = id_table("t", 10);
        let mut reported = 0;
        let mut sink = |_: Progress| reported += 1;

        let outcome = loader(1000).load(&mut session, &mut table, &mut sink).await;

        assert!(!outcome.is_success());
        assert!(outcome
            .message()
            .unwrap()
            .starts_with("Table Creation Error: "));
        assert!(session.log().iter().all(|s| !s.starts_with("INSERT")));
        assert_eq!(reported, 0);
    }

    #[tokio::test]
    async fn test_invalid_table_name_fails_before_io() {
        let mut session = RecordingSession::new();
        let mut table = id_table("bad name; DROP", 1);
        let outcome = loader(1000)
            .load(&mut session, &mut table, &mut no_progress())
            .await;
        assert!(matches!(
            outcome,
            LoadOutcome::Failed {
                phase: LoadPhase::CreateTable,
                ..
            }
        ));
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_coercion_failure_is_a_batch_failure() {
        let mut session = RecordingSession::new();
        let mut values = vec![Value::Int(1); 5];
        values[3] = Value::Float(f64::NAN);
        let mut table = Table::new("t", vec![Column::new("n", StorageClass::Int64, values)]);

        let outcome = loader(2).load(&mut session, &mut table, &mut no_progress()).await;

        match outcome {
            LoadOutcome::Failed {
                phase,
                message,
                rows_committed,
            } => {
                assert_eq!(phase, LoadPhase::Insert);
                assert!(message.contains("column n at row 3"), "{}", message);
                assert_eq!(rows_committed, 2);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(session.committed_rows("t"), 2);
    }

    #[tokio::test]
    async fn test_empty_table_reports_completion() {
        let mut session = RecordingSession::new();
        let mut table = id_table("t", 0);
        let mut fractions = Vec::new();
        let mut sink = |p: Progress| fractions.push(p.fraction);

        let outcome = loader(1000).load(&mut session, &mut table, &mut sink).await;

        assert_eq!(outcome.rows(), Some(0));
        assert_eq!(fractions, [1.0]);
    }

    #[tokio::test]
    async fn test_placeholder_limit_splits_within_one_commit() {
        let mut session = RecordingSession::new();
        let mut table = id_table("t", 10);
        let loader = Loader::new(LoadConfig {
            batch_size: 10,
            max_placeholders: 8,
        });

        let outcome = loader.load(&mut session, &mut table, &mut no_progress()).await;

        assert!(outcome.is_success());
        let inserts: Vec<usize> = session
            .committed()
            .iter()
            .filter(|s| s.sql.starts_with("INSERT"))
            .map(|s| s.rows)
            .collect();
        assert_eq!(inserts, [4, 4, 2]);
        // CREATE TABLE plus one batch.
        assert_eq!(session.commits(), 2);
    }

    #[tokio::test]
    async fn test_torn_down_session_fails_in_flight_batch() {
        let mut session = RecordingSession::new();
        let mut table = id_table("t", 3);
        let loader = loader(1);
        loader.create_table(&mut session, &mut table).await.unwrap();
        session.close();

        let err = loader
            .insert_data(&mut session, &table, &mut no_progress())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::BatchInsert { batch: 1, .. }));
    }
}
