//! Core traits at the loader's seams.
//!
//! - [`Session`]: an open database session the loader borrows for one load
//! - [`ProgressSink`]: where per-batch progress goes
//!
//! The loader never owns the session. Acquiring it before the load and
//! releasing it afterwards (on success and failure alike) is the caller's job.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

use super::value::{Param, Progress};

/// An open database session executing SQL with positional `?` placeholders.
///
/// Statements run inside the session's current transaction until
/// [`commit`](Session::commit) or [`rollback`](Session::rollback).
/// Implementations return [`LoadError::Backend`](crate::LoadError::Backend)
/// carrying the backend's own error text; the loader attributes it to a phase.
///
/// # Example
///
/// ```rust,ignore
/// let mut session = MysqlSession::connect(&config.target).await?;
/// session.execute("CREATE TABLE IF NOT EXISTS t (a INT)").await?;
/// session.commit().await?;
/// session.close().await?;
/// ```
#[async_trait]
pub trait Session: Send {
    /// Execute a statement without parameters.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Execute a statement binding `params` to its placeholders in order.
    async fn execute_with_params(&mut self, sql: &str, params: Vec<Param>) -> Result<()>;

    /// Commit the current transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Discard uncommitted work.
    async fn rollback(&mut self) -> Result<()>;

    /// Get the database type identifier (e.g., "mysql").
    fn db_type(&self) -> &str;
}

/// Receives one [`Progress`] per committed batch.
///
/// Implemented for any `FnMut(Progress) + Send` closure. Use
/// [`channel_sink`] to forward into a tokio channel instead.
pub trait ProgressSink: Send {
    fn report(&mut self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: FnMut(Progress) + Send,
{
    fn report(&mut self, progress: Progress) {
        (*self)(progress)
    }
}

/// A sink that forwards progress into an unbounded channel.
///
/// Sends to a closed channel are dropped; a gone listener never fails a load.
pub fn channel_sink(tx: mpsc::UnboundedSender<Progress>) -> impl ProgressSink {
    move |progress: Progress| {
        let _ = tx.send(progress);
    }
}

/// A sink that discards progress.
pub fn no_progress() -> impl ProgressSink {
    |_: Progress| {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(fraction: f64) -> Progress {
        Progress {
            batches_done: 1,
            batches_total: 2,
            rows_done: 1,
            rows_total: 2,
            fraction,
        }
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: Progress| seen.push(p.fraction);
            sink.report(sample(0.5));
            sink.report(sample(1.0));
        }
        assert_eq!(seen, vec![0.5, 1.0]);
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = channel_sink(tx);
        sink.report(sample(0.5));
        assert_eq!(rx.try_recv().unwrap().fraction, 0.5);
        drop(rx);
        sink.report(sample(1.0));
    }
}
