//! Producer-facing pipeline lifecycle
//!
//! Bridges upload handlers to the background worker: `start` idempotently
//! ensures the worker task is running, `enqueue` hands off a job, `stop`
//! requests graceful shutdown and waits a bounded time for it.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::ProcessingConfig;
use crate::error::Result;
use crate::extraction::ExtractionService;
use crate::storage::DocumentStore;
use crate::types::document::FileType;

use super::job_queue::{Job, JobQueue, JobReceiver};
use super::worker::ExtractionWorker;

/// Handle to the asynchronous processing pipeline
///
/// Cheap to clone; all clones share the queue and the single worker.
#[derive(Clone)]
pub struct ProcessingPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    store: DocumentStore,
    extraction: Arc<ExtractionService>,
    config: ProcessingConfig,
    queue: RwLock<JobQueue>,
    /// Receiver waiting to be claimed by the next `start`
    pending_receiver: Mutex<Option<JobReceiver>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessingPipeline {
    /// Create a pipeline; the worker is not running until `start` is called
    pub fn new(
        store: DocumentStore,
        extraction: Arc<ExtractionService>,
        config: ProcessingConfig,
    ) -> Self {
        let (queue, receiver) = JobQueue::channel();
        Self {
            inner: Arc::new(PipelineInner {
                store,
                extraction,
                config,
                queue: RwLock::new(queue),
                pending_receiver: Mutex::new(Some(receiver)),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Idempotently ensure the worker task is running
    ///
    /// Must be called from within a tokio runtime. After a `stop`, a new
    /// queue is created for the restarted worker; jobs enqueued while no
    /// worker existed on the old queue are lost, which matches the
    /// no-durability contract.
    pub fn start(&self) {
        let mut worker = self.inner.worker.lock();
        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }

        let receiver = self.inner.pending_receiver.lock().take().unwrap_or_else(|| {
            let (queue, receiver) = JobQueue::channel();
            *self.inner.queue.write() = queue;
            receiver
        });

        let task = ExtractionWorker::new(
            self.inner.store.clone(),
            self.inner.extraction.clone(),
            &self.inner.config,
        );
        *worker = Some(tokio::spawn(task.run(receiver)));
    }

    /// Hand a new job to the worker
    pub fn enqueue(&self, document_id: Uuid, file_type: FileType, payload: Vec<u8>) -> Result<()> {
        self.inner
            .queue
            .read()
            .enqueue(Job::new(document_id, file_type, payload))
    }

    /// Request graceful shutdown and wait for the worker, bounded
    ///
    /// The in-flight job (if any) finishes first since the worker processes
    /// one job at a time. If the worker does not exit within the configured
    /// timeout, it is abandoned rather than aborted.
    pub async fn stop(&self) {
        let handle = { self.inner.worker.lock().take() };
        let Some(handle) = handle else {
            return;
        };

        self.inner.queue.read().send_stop().ok();

        let wait = Duration::from_secs(self.inner.config.shutdown_timeout_secs);
        match tokio::time::timeout(wait, handle).await {
            Ok(_) => tracing::info!("processing pipeline stopped"),
            Err(_) => tracing::warn!(
                "worker did not stop within {}s, abandoning it",
                wait.as_secs()
            ),
        }
    }

    /// Whether the worker task is currently running
    pub fn is_running(&self) -> bool {
        self.inner
            .worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
