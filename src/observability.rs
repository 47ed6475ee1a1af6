//! Tracing setup and in-process counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

use crate::batch::BatchReport;

const DEFAULT_FILTER: &str = "batchreg=info";

/// Install the global fmt subscriber on stderr, honouring `RUST_LOG` when set
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Default)]
pub struct Metrics {
    batches_completed: AtomicU64,
    batches_rejected: AtomicU64,
    records_succeeded: AtomicU64,
    records_failed: AtomicU64,
    dispatch_attempts: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_completed(&self, report: &BatchReport) {
        let attempts: u64 = report.results.iter().map(|r| u64::from(r.attempts)).sum();

        self.batches_completed.fetch_add(1, Ordering::Relaxed);
        self.records_succeeded
            .fetch_add(report.succeeded as u64, Ordering::Relaxed);
        self.records_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.dispatch_attempts.fetch_add(attempts, Ordering::Relaxed);
        tracing::debug!(counter = "batches_completed", attempts, "Metric incremented");
    }

    pub fn batch_rejected(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "batches_rejected", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
            records_succeeded: self.records_succeeded.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
            dispatch_attempts: self.dispatch_attempts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub batches_completed: u64,
    pub batches_rejected: u64,
    pub records_succeeded: u64,
    pub records_failed: u64,
    pub dispatch_attempts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::AttemptError;
    use crate::records::Record;
    use crate::retry::RecordResult;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_batch_completed_accumulates() {
        let result = |succeeded, attempts| RecordResult {
            record: Record {
                name: "A".to_string(),
                email: "a@x.com".to_string(),
            },
            succeeded,
            attempts,
            last_error: (!succeeded).then(|| AttemptError::transport("boom")),
            cancelled: false,
        };
        let report = BatchReport::new(
            Uuid::now_v7(),
            "evt".to_string(),
            vec![result(true, 2), result(false, 3)],
            0,
            Utc::now(),
        );

        let metrics = Metrics::new();
        metrics.batch_completed(&report);
        metrics.batch_completed(&report);
        metrics.batch_rejected();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                batches_completed: 2,
                batches_rejected: 1,
                records_succeeded: 2,
                records_failed: 2,
                dispatch_attempts: 10,
            }
        );
    }
}
