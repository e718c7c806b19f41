//! docpipe: document processing service with an asynchronous extraction pipeline
//!
//! Uploaded documents are recorded in a SQLite-backed store and handed to a
//! single background worker through an in-memory job queue. The worker drives
//! each document through a status state machine (pending → processing →
//! completed/failed) while calling text extraction through a circuit breaker,
//! with bounded retries and exponential backoff.

pub mod config;
pub mod error;
pub mod extraction;
pub mod parsing;
pub mod processing;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use types::{
    document::{DocumentRecord, DocumentStatus, FileType, ProcessingLogEntry},
    parsed::ParsedData,
};
