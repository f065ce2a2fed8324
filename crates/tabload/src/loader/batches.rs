//! Batch partitioning and progress accounting.

use crate::core::value::Progress;

/// Default rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Row range of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSpan {
    /// 1-based batch number.
    pub index: usize,
    /// First row (inclusive).
    pub start: usize,
    /// Last row (exclusive).
    pub end: usize,
}

impl BatchSpan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Partition of `total_rows` into contiguous batches of `batch_size`.
///
/// Spans cover every row exactly once, in order; only the last may be short.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlan {
    total_rows: usize,
    batch_size: usize,
}

impl BatchPlan {
    /// A zero batch size is treated as 1.
    pub fn new(total_rows: usize, batch_size: usize) -> Self {
        Self {
            total_rows,
            batch_size: batch_size.max(1),
        }
    }

    /// Number of batches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.total_rows.div_ceil(self.batch_size)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    pub fn spans(&self) -> impl Iterator<Item = BatchSpan> {
        let Self {
            total_rows,
            batch_size,
        } = *self;
        (0..total_rows)
            .step_by(batch_size)
            .enumerate()
            .map(move |(i, start)| BatchSpan {
                index: i + 1,
                start,
                end: (start + batch_size).min(total_rows),
            })
    }

    /// Progress after `span` has been committed:
    /// `min(1, (start + batch_size) / total_rows)`, exactly 1.0 on the last batch.
    pub fn progress_after(&self, span: BatchSpan) -> Progress {
        let submitted = span.start + self.batch_size;
        let fraction = if submitted >= self.total_rows {
            1.0
        } else {
            submitted as f64 / self.total_rows as f64
        };
        Progress {
            batches_done: span.index,
            batches_total: self.len(),
            rows_done: span.end,
            rows_total: self.total_rows,
            fraction,
        }
    }

    /// Terminal progress value.
    pub fn complete(&self) -> Progress {
        Progress {
            batches_done: self.len(),
            batches_total: self.len(),
            rows_done: self.total_rows,
            rows_total: self.total_rows,
            fraction: 1.0,
        }
    }
}
