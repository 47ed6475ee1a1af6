use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::retry::RecordResult;

/// Outcome of one batch, one entry per parsed record in input order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub event_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Non-blank input lines that did not parse into a record
    pub skipped_lines: usize,
    /// Cancellation stopped at least one record early
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: String,
    pub results: Vec<RecordResult>,
}

impl BatchReport {
    pub fn new(
        batch_id: Uuid,
        event_id: String,
        results: Vec<RecordResult>,
        skipped_lines: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.succeeded).count();
        let cancelled = results.iter().any(|r| r.cancelled);

        let mut report = Self {
            batch_id,
            event_id,
            total,
            succeeded,
            failed: total - succeeded,
            skipped_lines,
            cancelled,
            started_at,
            finished_at: Utc::now(),
            summary: String::new(),
            results,
        };
        report.summary = report.render_summary();
        report
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn render_summary(&self) -> String {
        let mut summary = format!(
            "Processed {} {} for event {}: {} succeeded, {} failed",
            self.total,
            plural(self.total, "record", "records"),
            self.event_id,
            self.succeeded,
            self.failed,
        );
        if self.skipped_lines > 0 {
            summary.push_str(&format!(
                ", {} malformed {} skipped",
                self.skipped_lines,
                plural(self.skipped_lines, "line", "lines")
            ));
        }
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

/// Summary line followed by one line per failed record
impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary)?;
        for failure in self.failures() {
            write!(
                f,
                "  - {} <{}>: {} {}",
                failure.record.name.trim(),
                failure.record.email,
                failure.attempts,
                plural(failure.attempts as usize, "attempt", "attempts"),
            )?;
            if let Some(error) = &failure.last_error {
                write!(f, ", last error: {}", error)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::AttemptError;
    use crate::records::Record;

    fn result(name: &str, succeeded: bool, attempts: u32) -> RecordResult {
        RecordResult {
            record: Record {
                name: name.to_string(),
                email: format!("{}@x.com", name.to_lowercase()),
            },
            succeeded,
            attempts,
            last_error: (!succeeded).then(|| AttemptError::status(500, "HTTP 500: Internal Server Error", None)),
            cancelled: false,
        }
    }

    #[test]
    fn test_counts() {
        let report = BatchReport::new(
            Uuid::now_v7(),
            "evt-1".to_string(),
            vec![result("A", true, 1), result("B", false, 3), result("C", true, 2)],
            2,
            Utc::now(),
        );

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.all_succeeded());
        assert!(!report.cancelled);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            report.summary,
            "Processed 3 records for event evt-1: 2 succeeded, 1 failed, 2 malformed lines skipped"
        );
    }

    #[test]
    fn test_display_lists_failures() {
        let report = BatchReport::new(
            Uuid::now_v7(),
            "evt-1".to_string(),
            vec![result("A", true, 1), result("B", false, 3)],
            0,
            Utc::now(),
        );

        let rendered = report.to_string();
        assert!(rendered.starts_with("Processed 2 records for event evt-1: 1 succeeded, 1 failed\n"));
        assert!(rendered.contains("  - B <b@x.com>: 3 attempts, last error: HTTP 500: Internal Server Error"));
        assert!(!rendered.contains("<a@x.com>"));
    }

    #[test]
    fn test_empty_report() {
        let report = BatchReport::new(Uuid::now_v7(), "evt-1".to_string(), vec![], 1, Utc::now());

        assert!(report.is_empty());
        assert!(report.all_succeeded());
        assert_eq!(
            report.summary,
            "Processed 0 records for event evt-1: 0 succeeded, 0 failed, 1 malformed line skipped"
        );
    }

    #[test]
    fn test_cancelled_flag() {
        let mut cancelled = result("A", false, 0);
        cancelled.cancelled = true;

        let report = BatchReport::new(Uuid::now_v7(), "evt-1".to_string(), vec![cancelled], 0, Utc::now());
        assert!(report.cancelled);
        assert!(report.summary.ends_with("(cancelled)"));
    }
}
