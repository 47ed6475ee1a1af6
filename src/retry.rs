//! Bounded, fixed-delay retry around a single record's registration

use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::RetryConfig;
use crate::dispatch::{AttemptError, AttemptOutcome, Dispatcher, UploadContext};
use crate::records::Record;

/// How many times to try a record and how long to wait in between.
///
/// The delay is the same before every retry; it never grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never below 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }
}

/// Final state of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordResult {
    pub record: Record,
    pub succeeded: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<AttemptError>,
    /// Stopped by batch cancellation before running out of attempts
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl RecordResult {
    fn succeeded(record: Record, attempts: u32) -> Self {
        Self {
            record,
            succeeded: true,
            attempts,
            last_error: None,
            cancelled: false,
        }
    }

    fn exhausted(record: Record, attempts: u32, error: AttemptError) -> Self {
        Self {
            record,
            succeeded: false,
            attempts,
            last_error: Some(error),
            cancelled: false,
        }
    }

    pub(crate) fn cancelled(record: Record, attempts: u32, last_error: Option<AttemptError>) -> Self {
        Self {
            record,
            succeeded: false,
            attempts,
            last_error: last_error
                .or_else(|| Some(AttemptError::transport("batch cancelled before the first attempt"))),
            cancelled: true,
        }
    }
}

/// Register `record`, retrying failed attempts under `policy`.
///
/// Never fails: exhaustion and cancellation are reported in the returned
/// [`RecordResult`]. Once `cancel` fires no new attempt starts and a pending
/// delay is cut short; an attempt already in flight runs to completion.
pub async fn attempt(
    dispatcher: &dyn Dispatcher,
    record: Record,
    context: &UploadContext,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> RecordResult {
    let mut attempts = 0;
    let mut last_error = None;

    loop {
        if cancel.is_cancelled() {
            debug!(attempts, "Batch cancelled, not retrying");
            return RecordResult::cancelled(record, attempts, last_error);
        }

        attempts += 1;
        let request = context.request_for(&record);

        match dispatcher.send(&request, &context.credentials).await {
            AttemptOutcome::Success(data) => {
                if attempts > 1 {
                    debug!(attempts, "Registration succeeded after retry");
                }
                trace!(response = %data, "Registration response");
                return RecordResult::succeeded(record, attempts);
            }
            AttemptOutcome::Failure(error) => {
                if attempts >= policy.max_attempts {
                    warn!(attempts, error = %error, "Registration failed after retries");
                    return RecordResult::exhausted(record, attempts, error);
                }

                warn!(
                    attempts,
                    error = %error,
                    delay_ms = policy.delay.as_millis() as u64,
                    "Registration failed, retrying"
                );
                last_error = Some(error);

                tokio::select! {
                    _ = tokio::time::sleep(policy.delay) => {}
                    _ = cancel.cancelled() => {
                        debug!(attempts, "Batch cancelled during retry delay");
                        return RecordResult::cancelled(record, attempts, last_error);
                    }
                }
            }
        }
    }
}
