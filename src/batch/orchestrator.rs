use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::report::BatchReport;
use super::{BatchError, RawUpload};
use crate::config::Config;
use crate::dispatch::{Dispatcher, UploadContext};
use crate::records::{self, Record};
use crate::retry::{self, RecordResult, RetryPolicy};

/// Runs every record of an upload through the retry coordinator.
///
/// With `concurrency == 1` records are processed strictly one after another.
/// Larger values run up to that many records at once; results are tagged with
/// their input index and put back in order before the report is built.
#[derive(Clone)]
pub struct BatchOrchestrator {
    dispatcher: Arc<dyn Dispatcher>,
    policy: RetryPolicy,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, policy: RetryPolicy) -> Self {
        Self {
            dispatcher,
            policy,
            concurrency: 1,
        }
    }

    pub fn from_config(dispatcher: Arc<dyn Dispatcher>, config: &Config) -> Self {
        Self::new(dispatcher, RetryPolicy::from(&config.retry))
            .with_concurrency(config.batch.concurrency)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Validate, parse and dispatch one upload.
    ///
    /// # Errors
    ///
    /// Fails as a whole when a context field is blank or the buffer is not
    /// UTF-8. Individual record failures never fail the batch.
    pub async fn process_upload(
        &self,
        upload: RawUpload,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        let context = upload.context()?;
        let parsed = records::parse(&upload.buffer)?;

        Ok(self
            .execute(parsed.records, &context, parsed.skipped_lines, cancel)
            .await)
    }

    /// Dispatch already-parsed records
    pub async fn run(
        &self,
        records: Vec<Record>,
        context: &UploadContext,
        cancel: &CancellationToken,
    ) -> BatchReport {
        self.execute(records, context, 0, cancel).await
    }

    async fn execute(
        &self,
        records: Vec<Record>,
        context: &UploadContext,
        skipped_lines: usize,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let batch_id = Uuid::now_v7();
        let started_at = Utc::now();
        let timer = Instant::now();
        let span = info_span!("batch", %batch_id, event_id = %context.event_id);

        async {
            info!(
                records = records.len(),
                skipped_lines,
                concurrency = self.concurrency,
                "Starting batch"
            );

            let results = if self.concurrency == 1 {
                self.run_sequential(records, context, cancel).await
            } else {
                self.run_concurrent(records, context, cancel).await
            };

            let report = BatchReport::new(
                batch_id,
                context.event_id.clone(),
                results,
                skipped_lines,
                started_at,
            );

            info!(
                succeeded = report.succeeded,
                failed = report.failed,
                cancelled = report.cancelled,
                duration_ms = timer.elapsed().as_millis() as u64,
                "Batch completed"
            );

            report
        }
        .instrument(span)
        .await
    }

    async fn run_sequential(
        &self,
        records: Vec<Record>,
        context: &UploadContext,
        cancel: &CancellationToken,
    ) -> Vec<RecordResult> {
        let mut results = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            let result = retry::attempt(self.dispatcher.as_ref(), record, context, &self.policy, cancel)
                .instrument(info_span!("record", index))
                .await;
            results.push(result);
        }

        results
    }

    async fn run_concurrent(
        &self,
        records: Vec<Record>,
        context: &UploadContext,
        cancel: &CancellationToken,
    ) -> Vec<RecordResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let context = Arc::new(context.clone());
        let mut slots: Vec<Option<RecordResult>> = vec![None; records.len()];
        let mut tasks = JoinSet::new();

        // Permits are taken here, so records start in input order. Records
        // still waiting for a permit at cancellation are never spawned.
        for (index, record) in records.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let dispatcher = self.dispatcher.clone();
            let context = context.clone();
            let policy = self.policy;
            let cancel = cancel.clone();
            let record = record.clone();

            tasks.spawn(
                async move {
                    let _permit = permit;
                    let result =
                        retry::attempt(dispatcher.as_ref(), record, &context, &policy, &cancel).await;
                    (index, result)
                }
                .instrument(info_span!("record", index)),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => warn!(error = %e, "Dispatch task did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(records)
            .map(|(slot, record)| slot.unwrap_or_else(|| RecordResult::cancelled(record, 0, None)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{AttemptError, AttemptOutcome, Credentials, DispatchRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails every call for the listed emails, succeeds otherwise
    #[derive(Default)]
    struct ScriptedDispatcher {
        failing: Vec<String>,
        calls: Mutex<HashMap<String, u32>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        latency: Duration,
    }

    impl ScriptedDispatcher {
        fn failing(emails: &[&str]) -> Self {
            Self {
                failing: emails.iter().map(|e| e.to_string()).collect(),
                ..Self::default()
            }
        }

        fn calls_for(&self, email: &str) -> u32 {
            self.calls.lock().unwrap().get(email).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Dispatcher for ScriptedDispatcher {
        async fn send(&self, request: &DispatchRequest, _credentials: &Credentials) -> AttemptOutcome {
            *self.calls.lock().unwrap().entry(request.email.clone()).or_default() += 1;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&request.email) {
                AttemptOutcome::Failure(AttemptError::status(500, "HTTP 500: Internal Server Error", None))
            } else {
                AttemptOutcome::Success(json!({"registered": request.email}))
            }
        }
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                name: format!("User {}", i),
                email: format!("user{}@x.com", i),
            })
            .collect()
    }

    fn context() -> UploadContext {
        UploadContext::new("evt-7", Credentials::new("key", "secret"))
    }

    fn orchestrator(dispatcher: Arc<ScriptedDispatcher>) -> BatchOrchestrator {
        BatchOrchestrator::new(dispatcher, RetryPolicy::new(3, Duration::from_millis(1000)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_batch() {
        let dispatcher = Arc::new(ScriptedDispatcher::failing(&["user1@x.com"]));
        let report = orchestrator(dispatcher.clone())
            .run(records(3), &context(), &CancellationToken::new())
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.results[1].succeeded);
        assert_eq!(report.results[1].attempts, 3);
        assert_eq!(dispatcher.calls_for("user1@x.com"), 3);
        assert_eq!(dispatcher.calls_for("user2@x.com"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_preserves_order() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let input = records(5);
        let report = orchestrator(dispatcher.clone())
            .run(input.clone(), &context(), &CancellationToken::new())
            .await;

        let output: Vec<Record> = report.results.iter().map(|r| r.record.clone()).collect();
        assert_eq!(output, input);
        assert_eq!(dispatcher.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_preserves_order_and_bound() {
        let dispatcher = Arc::new(ScriptedDispatcher {
            failing: vec!["user3@x.com".to_string(), "user8@x.com".to_string()],
            latency: Duration::from_millis(50),
            ..ScriptedDispatcher::default()
        });
        let input = records(12);
        let report = orchestrator(dispatcher.clone())
            .with_concurrency(4)
            .run(input.clone(), &context(), &CancellationToken::new())
            .await;

        let output: Vec<Record> = report.results.iter().map(|r| r.record.clone()).collect();
        assert_eq!(output, input);
        assert_eq!(report.failed, 2);
        assert!(!report.results[3].succeeded);
        assert!(!report.results[8].succeeded);
        assert!(dispatcher.max_in_flight.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let report = orchestrator(dispatcher)
            .with_concurrency(3)
            .run(Vec::new(), &context(), &CancellationToken::new())
            .await;

        assert!(report.is_empty());
        assert!(report.all_succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_still_reports_every_record() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = orchestrator(dispatcher.clone())
            .run(records(4), &context(), &cancel)
            .await;

        assert_eq!(report.len(), 4);
        assert!(report.cancelled);
        assert!(report.results.iter().all(|r| r.cancelled && r.attempts == 0));
        assert_eq!(dispatcher.calls_for("user0@x.com"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_cancel_mid_batch_reports_every_record() {
        let dispatcher = Arc::new(ScriptedDispatcher {
            latency: Duration::from_millis(100),
            ..ScriptedDispatcher::default()
        });
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            canceller.cancel();
        });

        // Records 0..3 finish at 100ms, 3..6 are in flight at 150ms
        let report = orchestrator(dispatcher.clone())
            .with_concurrency(3)
            .run(records(9), &context(), &cancel)
            .await;

        assert_eq!(report.len(), 9);
        assert!(report.cancelled);
        for (i, result) in report.results.iter().enumerate() {
            assert_eq!(result.record.email, format!("user{}@x.com", i));
            if i < 6 {
                assert!(result.succeeded && !result.cancelled);
                assert_eq!(result.attempts, 1);
            } else {
                assert!(!result.succeeded && result.cancelled);
                assert_eq!(result.attempts, 0);
                assert_eq!(dispatcher.calls_for(&result.record.email), 0);
            }
        }
        assert_eq!(report.succeeded, 6);
        assert_eq!(report.failed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_pre_cancelled_dispatches_nothing() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = orchestrator(dispatcher.clone())
            .with_concurrency(3)
            .run(records(5), &context(), &cancel)
            .await;

        assert_eq!(report.len(), 5);
        assert!(report.results.iter().all(|r| r.cancelled && r.attempts == 0));
        assert_eq!(report.results[4].record.email, "user4@x.com");
        assert_eq!(dispatcher.calls_for("user0@x.com"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_upload() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let upload = RawUpload::new("evt-7", "key", "secret", "X,x@y.com\nbroken\nY,y@y.com");

        let report = orchestrator(dispatcher)
            .process_upload(upload, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report.skipped_lines, 1);
        assert!(report.results.iter().all(|r| r.succeeded && r.attempts == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_upload_rejects_missing_context() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let upload = RawUpload::new("evt-7", "key", " ", "X,x@y.com");

        let result = orchestrator(dispatcher.clone())
            .process_upload(upload, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(BatchError::MissingField("apiSecret"))));
        assert_eq!(dispatcher.calls_for("x@y.com"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_upload_rejects_unreadable_buffer() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let upload = RawUpload::new("evt-7", "key", "secret", &b"X,x@y.com\n\xc3\x28"[..]);

        let result = orchestrator(dispatcher)
            .process_upload(upload, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(BatchError::UnreadableInput(_))));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.retry.max_attempts = 5;
        config.batch.concurrency = 0;

        let orchestrator = BatchOrchestrator::from_config(Arc::new(ScriptedDispatcher::default()), &config);
        assert_eq!(orchestrator.policy().max_attempts, 5);
        assert_eq!(orchestrator.concurrency, 1);
    }
}
