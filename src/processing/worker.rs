//! Background worker: dequeues jobs and drives the retry/backoff protocol

use std::sync::Arc;
use std::time::Duration;

use crate::config::ProcessingConfig;
use crate::error::Error;
use crate::extraction::ExtractionService;
use crate::storage::DocumentStore;
use crate::types::document::DocumentStatus;

use super::job_queue::{Dequeued, Job, JobReceiver};

/// Backoff cap in seconds for the `min(2^attempts, cap)` schedule
const MAX_BACKOFF_SECS: u64 = 10;

/// Single-consumer extraction worker
///
/// Processes one job fully, including all retries and backoff sleeps, before
/// dequeuing the next, so throughput is bounded by one job's wall-clock
/// time. No job failure ever terminates the worker itself.
pub struct ExtractionWorker {
    store: DocumentStore,
    extraction: Arc<ExtractionService>,
    max_attempts: u32,
    poll_interval: Duration,
}

impl ExtractionWorker {
    /// Create a worker over the shared store and extraction service
    pub fn new(
        store: DocumentStore,
        extraction: Arc<ExtractionService>,
        config: &ProcessingConfig,
    ) -> Self {
        Self {
            store,
            extraction,
            max_attempts: config.max_attempts,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// Consume jobs until the stop sentinel arrives
    pub async fn run(self, mut receiver: JobReceiver) {
        tracing::info!(
            "extraction worker started (max {} attempts per job)",
            self.max_attempts
        );

        loop {
            match receiver.dequeue(self.poll_interval).await {
                Dequeued::TimedOut => continue,
                Dequeued::Stop => break,
                Dequeued::Closed => {
                    tracing::warn!("job queue closed without a stop signal");
                    break;
                }
                Dequeued::Job(job) => self.process(job).await,
            }
        }

        tracing::info!("extraction worker stopped");
    }

    /// Run one job to a terminal document status
    async fn process(&self, mut job: Job) {
        let document_id = job.document_id;

        while job.attempts < self.max_attempts {
            // Re-marking processing on every attempt is an idempotent write;
            // each one also lands in the audit log.
            if let Err(e) =
                self.store
                    .update_status(&document_id, DocumentStatus::Processing, None, None, None)
            {
                tracing::warn!("failed to mark document {} processing: {}", document_id, e);
            }

            match self.extraction.extract(job.file_type, &job.payload).await {
                Ok(extracted) => {
                    tracing::info!(
                        "document {} extracted: {} chars, confidence {:.2}, pages {:?}",
                        document_id,
                        extracted.text.len(),
                        extracted.confidence,
                        extracted.pages
                    );
                    if let Err(e) = self.store.update_status(
                        &document_id,
                        DocumentStatus::Completed,
                        None,
                        Some(&extracted.text),
                        None,
                    ) {
                        tracing::error!("failed to complete document {}: {}", document_id, e);
                    }
                    return;
                }
                Err(e) => {
                    // An open-breaker rejection consumes an attempt exactly
                    // like an extraction failure.
                    if matches!(e, Error::CircuitOpen) {
                        tracing::warn!(
                            "document {} attempt {} rejected by open circuit breaker",
                            document_id,
                            job.attempts + 1
                        );
                    } else {
                        tracing::warn!(
                            "document {} attempt {} failed: {}",
                            document_id,
                            job.attempts + 1,
                            e
                        );
                    }

                    job.attempts += 1;
                    if job.attempts >= self.max_attempts {
                        if let Err(store_err) = self.store.update_status(
                            &document_id,
                            DocumentStatus::Failed,
                            Some(&e.to_string()),
                            None,
                            None,
                        ) {
                            tracing::error!(
                                "failed to mark document {} failed: {}",
                                document_id,
                                store_err
                            );
                        }
                        return;
                    }

                    let delay = backoff_delay(job.attempts);
                    tracing::info!(
                        "retrying document {} in {}s (attempt {}/{})",
                        document_id,
                        delay.as_secs(),
                        job.attempts + 1,
                        self.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Exponential backoff, capped: `min(2^attempts, 10)` seconds
fn backoff_delay(attempts: u32) -> Duration {
    let secs = 1u64 << attempts.min(6);
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerConfig;
    use crate::error::Result;
    use crate::extraction::ExtractionBackend;
    use crate::types::document::FileType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Backend scripted to fail a fixed number of times, counting calls
    struct ScriptedBackend {
        text: String,
        failures_before_success: AtomicU32,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn succeeding(text: &str) -> Self {
            Self {
                text: text.to_string(),
                failures_before_success: AtomicU32::new(0),
                calls: AtomicU32::new(0),
            }
        }

        fn always_failing() -> Self {
            Self {
                text: String::new(),
                failures_before_success: AtomicU32::new(u32::MAX),
                calls: AtomicU32::new(0),
            }
        }

        fn answer(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_before_success.load(Ordering::SeqCst) > 0 {
                if self.failures_before_success.load(Ordering::SeqCst) != u32::MAX {
                    self.failures_before_success.fetch_sub(1, Ordering::SeqCst);
                }
                Err(Error::Extraction("backend exploded".into()))
            } else {
                Ok(self.text.clone())
            }
        }
    }

    #[async_trait]
    impl ExtractionBackend for ScriptedBackend {
        async fn extract_pdf(&self, _data: &[u8]) -> Result<(String, Option<u32>)> {
            self.answer().map(|text| (text, Some(1)))
        }

        async fn ocr_pdf_pages(&self, _data: &[u8]) -> Result<String> {
            Ok(String::new())
        }

        async fn extract_image(&self, _data: &[u8]) -> Result<String> {
            self.answer()
        }
    }

    fn worker_with(
        backend: Arc<ScriptedBackend>,
        breaker: BreakerConfig,
    ) -> (ExtractionWorker, DocumentStore) {
        let store = DocumentStore::in_memory().unwrap();
        let config = ProcessingConfig::default();
        let service = Arc::new(ExtractionService::new(backend, &breaker));
        let worker = ExtractionWorker::new(store.clone(), service, &config);
        (worker, store)
    }

    #[test]
    fn backoff_follows_capped_exponential_schedule() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(4), Duration::from_secs(10));
        assert_eq!(backoff_delay(30), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn first_attempt_success_completes_document() {
        let backend = Arc::new(ScriptedBackend::succeeding("Hello"));
        let (worker, store) = worker_with(backend.clone(), BreakerConfig::default());
        let doc = store.create("a.pdf", FileType::Pdf, 5).unwrap();

        worker
            .process(Job::new(doc.id, FileType::Pdf, b"pdf".to_vec()))
            .await;

        let fetched = store.get(&doc.id).unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Completed);
        assert_eq!(fetched.raw_text.as_deref(), Some("Hello"));
        assert!(fetched.error_message.is_none());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_with_last_error() {
        let backend = Arc::new(ScriptedBackend::always_failing());
        let (worker, store) = worker_with(backend.clone(), BreakerConfig::default());
        let doc = store.create("a.png", FileType::Png, 5).unwrap();

        worker
            .process(Job::new(doc.id, FileType::Png, b"img".to_vec()))
            .await;

        let fetched = store.get(&doc.id).unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Failed);
        assert_eq!(
            fetched.error_message.as_deref(),
            Some("extraction failed: backend exploded")
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);

        // create + 3×processing + 1×failed, never more than max_attempts
        let statuses: Vec<_> = store
            .logs(&doc.id)
            .unwrap()
            .into_iter()
            .map(|e| e.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                DocumentStatus::Pending,
                DocumentStatus::Processing,
                DocumentStatus::Processing,
                DocumentStatus::Processing,
                DocumentStatus::Failed,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_on_final_attempt_completes() {
        let backend = Arc::new(ScriptedBackend {
            text: "late but fine".to_string(),
            failures_before_success: AtomicU32::new(2),
            calls: AtomicU32::new(0),
        });
        let (worker, store) = worker_with(backend.clone(), BreakerConfig::default());
        let doc = store.create("a.png", FileType::Png, 5).unwrap();

        worker
            .process(Job::new(doc.id, FileType::Png, b"img".to_vec()))
            .await;

        let fetched = store.get(&doc.id).unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Completed);
        assert_eq!(fetched.raw_text.as_deref(), Some("late but fine"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn open_breaker_consumes_attempts_without_backend_calls() {
        let backend = Arc::new(ScriptedBackend::always_failing());
        let (worker, store) = worker_with(
            backend.clone(),
            BreakerConfig {
                failure_threshold: 1,
                reset_timeout_secs: 3600,
            },
        );

        // One real failure opens the breaker...
        let first = store.create("a.png", FileType::Png, 5).unwrap();
        worker
            .process(Job::new(first.id, FileType::Png, b"img".to_vec()))
            .await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // ...after which a fresh job burns all its attempts on rejections.
        let second = store.create("b.png", FileType::Png, 5).unwrap();
        worker
            .process(Job::new(second.id, FileType::Png, b"img".to_vec()))
            .await;

        let fetched = store.get(&second.id).unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Failed);
        assert_eq!(
            fetched.error_message.as_deref(),
            Some("text extraction circuit breaker is open")
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_document_is_left_in_processing() {
        let backend = Arc::new(ScriptedBackend::succeeding(""));
        let (worker, store) = worker_with(backend, BreakerConfig::default());
        let doc = store.create("a.docx", FileType::Docx, 5).unwrap();

        worker
            .process(Job::new(doc.id, FileType::Docx, b"docx".to_vec()))
            .await;

        let fetched = store.get(&doc.id).unwrap().unwrap();
        assert!(fetched.status.is_terminal());
        // docx placeholder completes with empty text
        assert_eq!(fetched.status, DocumentStatus::Completed);
        assert_eq!(fetched.raw_text.as_deref(), Some(""));
    }
}
