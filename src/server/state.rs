//! Shared application state for the HTTP server

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::Result;
use crate::extraction::ExtractionService;
use crate::parsing::FieldParser;
use crate::processing::ProcessingPipeline;
use crate::storage::DocumentStore;

use super::cache::TextCache;
use super::ratelimit::RateLimiter;

/// Extracted-text responses are cached for an hour
const TEXT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: DocumentStore,
    pipeline: ProcessingPipeline,
    parser: FieldParser,
    text_cache: TextCache,
    limiter: RateLimiter,
}

impl AppState {
    /// Create state with the production extraction engine
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = DocumentStore::open(&config.storage.database_path)?;
        let extraction = Arc::new(ExtractionService::with_engine(&config.processing.breaker));
        Ok(Self::with_parts(config, store, extraction))
    }

    /// Create state over pre-built collaborators (used when embedding the
    /// service or substituting a mock extraction backend)
    pub fn with_parts(
        config: AppConfig,
        store: DocumentStore,
        extraction: Arc<ExtractionService>,
    ) -> Self {
        let pipeline =
            ProcessingPipeline::new(store.clone(), extraction, config.processing.clone());
        let limiter = RateLimiter::new(config.rate_limit.requests_per_minute);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                pipeline,
                parser: FieldParser::new(),
                text_cache: TextCache::new(TEXT_CACHE_TTL),
                limiter,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the document store
    pub fn store(&self) -> &DocumentStore {
        &self.inner.store
    }

    /// Get the processing pipeline handle
    pub fn pipeline(&self) -> &ProcessingPipeline {
        &self.inner.pipeline
    }

    /// Get the field parser
    pub fn parser(&self) -> &FieldParser {
        &self.inner.parser
    }

    /// Get the extracted-text cache
    pub fn text_cache(&self) -> &TextCache {
        &self.inner.text_cache
    }

    /// Get the rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }
}
