//! FIFO handoff between upload producers and the single extraction worker

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::document::FileType;

/// One unit of extraction work tied to a document
#[derive(Debug)]
pub struct Job {
    /// Document this job belongs to
    pub document_id: Uuid,
    /// File type of the payload
    pub file_type: FileType,
    /// Raw file bytes, owned by the job until consumed
    pub payload: Vec<u8>,
    /// Extraction attempts made so far
    pub attempts: u32,
}

impl Job {
    /// Create a fresh job with no attempts recorded
    pub fn new(document_id: Uuid, file_type: FileType, payload: Vec<u8>) -> Self {
        Self {
            document_id,
            file_type,
            payload,
            attempts: 0,
        }
    }
}

/// Channel payload: a job, or the shutdown sentinel
#[derive(Debug)]
enum QueueSignal {
    Work(Job),
    Stop,
}

/// Producer handle to the job queue
///
/// Unbounded and ordered: enqueuing never blocks on the consumer, delivery is
/// FIFO, and there is no depth cap or backpressure.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<QueueSignal>,
}

/// Consumer handle, held by exactly one worker at a time
pub struct JobReceiver {
    inner: mpsc::UnboundedReceiver<QueueSignal>,
}

/// Outcome of a bounded-wait dequeue
#[derive(Debug)]
pub enum Dequeued {
    /// The next job in FIFO order
    Job(Job),
    /// Shutdown sentinel; the worker loop should exit
    Stop,
    /// Nothing arrived within the wait window
    TimedOut,
    /// All producers are gone
    Closed,
}

impl JobQueue {
    /// Create a connected queue/receiver pair
    pub fn channel() -> (JobQueue, JobReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (JobQueue { sender }, JobReceiver { inner: receiver })
    }

    /// Hand a job to the worker; fails only after shutdown
    pub fn enqueue(&self, job: Job) -> Result<()> {
        self.sender
            .send(QueueSignal::Work(job))
            .map_err(|_| Error::Internal("job queue is shut down".to_string()))
    }

    /// Enqueue the shutdown sentinel
    ///
    /// Jobs already in the queue are delivered first, so the worker drains
    /// in-flight work before it sees the sentinel.
    pub fn send_stop(&self) -> Result<()> {
        self.sender
            .send(QueueSignal::Stop)
            .map_err(|_| Error::Internal("job queue is shut down".to_string()))
    }
}

impl JobReceiver {
    /// Wait up to `wait` for the next signal
    ///
    /// The bounded wait keeps the worker responsive to shutdown requests even
    /// when the queue is idle.
    pub async fn dequeue(&mut self, wait: Duration) -> Dequeued {
        match timeout(wait, self.inner.recv()).await {
            Err(_) => Dequeued::TimedOut,
            Ok(None) => Dequeued::Closed,
            Ok(Some(QueueSignal::Stop)) => Dequeued::Stop,
            Ok(Some(QueueSignal::Work(job))) => Dequeued::Job(job),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn delivers_jobs_in_fifo_order() {
        let (queue, mut receiver) = JobQueue::channel();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            queue.enqueue(Job::new(*id, FileType::Pdf, vec![1])).unwrap();
        }

        for expected in &ids {
            match receiver.dequeue(WAIT).await {
                Dequeued::Job(job) => assert_eq!(job.document_id, *expected),
                other => panic!("expected job, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn stop_sentinel_arrives_after_queued_jobs() {
        let (queue, mut receiver) = JobQueue::channel();
        queue
            .enqueue(Job::new(Uuid::new_v4(), FileType::Png, vec![]))
            .unwrap();
        queue.send_stop().unwrap();

        assert!(matches!(receiver.dequeue(WAIT).await, Dequeued::Job(_)));
        assert!(matches!(receiver.dequeue(WAIT).await, Dequeued::Stop));
    }

    #[tokio::test]
    async fn empty_queue_times_out() {
        let (_queue, mut receiver) = JobQueue::channel();
        assert!(matches!(receiver.dequeue(WAIT).await, Dequeued::TimedOut));
    }

    #[tokio::test]
    async fn dropped_producers_close_the_queue() {
        let (queue, mut receiver) = JobQueue::channel();
        drop(queue);
        assert!(matches!(receiver.dequeue(WAIT).await, Dequeued::Closed));
    }

    #[tokio::test]
    async fn enqueue_fails_once_receiver_is_gone() {
        let (queue, receiver) = JobQueue::channel();
        drop(receiver);
        let err = queue
            .enqueue(Job::new(Uuid::new_v4(), FileType::Docx, vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
