//! Asynchronous processing pipeline: job queue, worker, lifecycle

mod job_queue;
mod pipeline;
mod worker;

pub use job_queue::{Dequeued, Job, JobQueue, JobReceiver};
pub use pipeline::ProcessingPipeline;
pub use worker::ExtractionWorker;
