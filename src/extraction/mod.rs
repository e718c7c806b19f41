//! Breaker-gated text extraction
//!
//! `ExtractionService` is the single entry point the worker calls. It owns
//! the circuit breaker and dispatches per file type to an
//! `ExtractionBackend`; the production backend is [`TextEngine`], tests
//! substitute mocks. For PDFs an OCR-rasterization fallback runs when direct
//! extraction yields blank text, without consuming a retry attempt.

mod breaker;
mod engine;

pub use breaker::{BreakerPhase, CircuitBreaker};
pub use engine::TextEngine;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BreakerConfig;
use crate::error::{Error, Result};
use crate::types::document::FileType;

/// Raw extraction capability, typed over PDF and image payloads
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Direct PDF text extraction; also reports page count when known
    async fn extract_pdf(&self, data: &[u8]) -> Result<(String, Option<u32>)>;

    /// OCR fallback for PDFs whose direct extraction came back blank
    async fn ocr_pdf_pages(&self, data: &[u8]) -> Result<String>;

    /// OCR for raster images (png, jpg)
    async fn extract_image(&self, data: &[u8]) -> Result<String>;
}

/// Text extracted from one document
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Extracted text (may be empty for image-only or placeholder paths)
    pub text: String,
    /// Extraction confidence in [0, 1]
    pub confidence: f32,
    /// Page count, when the format has pages
    pub pages: Option<u32>,
}

/// Breaker-gated extraction service
///
/// One shared instance per worker; the breaker state spans all jobs and has
/// no per-document scoping.
pub struct ExtractionService {
    backend: Arc<dyn ExtractionBackend>,
    breaker: Mutex<CircuitBreaker>,
}

impl ExtractionService {
    /// Create a service over the given backend
    pub fn new(backend: Arc<dyn ExtractionBackend>, config: &BreakerConfig) -> Self {
        Self {
            backend,
            breaker: Mutex::new(CircuitBreaker::new(
                config.failure_threshold,
                Duration::from_secs(config.reset_timeout_secs),
            )),
        }
    }

    /// Create a service over the production [`TextEngine`]
    pub fn with_engine(config: &BreakerConfig) -> Self {
        Self::new(Arc::new(TextEngine::default()), config)
    }

    /// Extract text from a document's bytes
    ///
    /// Returns `Error::CircuitOpen` without touching the backend while the
    /// breaker is open. Backend failures are recorded on the breaker and
    /// surfaced as `Error::Extraction`; successes reset it.
    pub async fn extract(&self, file_type: FileType, data: &[u8]) -> Result<ExtractedText> {
        if !self.breaker.lock().allow() {
            return Err(Error::CircuitOpen);
        }

        match self.dispatch(file_type, data).await {
            Ok(extracted) => {
                self.breaker.lock().record_success();
                Ok(extracted)
            }
            Err(e) => {
                self.breaker.lock().record_failure();
                match e {
                    Error::Extraction(_) => Err(e),
                    other => Err(Error::Extraction(other.to_string())),
                }
            }
        }
    }

    async fn dispatch(&self, file_type: FileType, data: &[u8]) -> Result<ExtractedText> {
        match file_type {
            FileType::Pdf => {
                let (text, pages) = self.backend.extract_pdf(data).await?;
                if !text.trim().is_empty() {
                    return Ok(ExtractedText {
                        text,
                        confidence: 0.85,
                        pages,
                    });
                }

                // Blank direct extraction usually means a scanned PDF; try
                // rasterizing and OCRing the pages before accepting empty.
                let ocr_text = match self.backend.ocr_pdf_pages(data).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!("pdf OCR fallback unavailable: {}", e);
                        String::new()
                    }
                };

                if !ocr_text.trim().is_empty() {
                    Ok(ExtractedText {
                        text: ocr_text,
                        confidence: 0.6,
                        pages,
                    })
                } else {
                    Ok(ExtractedText {
                        text: String::new(),
                        confidence: 0.2,
                        pages,
                    })
                }
            }
            FileType::Png | FileType::Jpg => {
                let text = self.backend.extract_image(data).await?;
                let confidence = if text.trim().is_empty() { 0.2 } else { 0.8 };
                Ok(ExtractedText {
                    text,
                    confidence,
                    pages: None,
                })
            }
            // docx extraction is a placeholder: accepted, but no text
            FileType::Docx => Ok(ExtractedText {
                text: String::new(),
                confidence: 0.1,
                pages: None,
            }),
        }
    }

    /// Current breaker phase, for logs and diagnostics
    pub fn breaker_phase(&self) -> BreakerPhase {
        self.breaker.lock().phase()
    }
}
