//! Configuration for the document processing service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Document store configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Worker, retry and circuit breaker configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Per-client rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes (default: 10MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let database_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docpipe")
            .join("documents.db");

        Self { database_path }
    }
}

/// Worker and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Maximum extraction attempts per job (default: 3)
    pub max_attempts: u32,
    /// How long a dequeue waits before re-checking for shutdown, in
    /// milliseconds (default: 500)
    pub poll_interval_ms: u64,
    /// How long `stop()` waits for the worker to drain before abandoning it,
    /// in seconds (default: 5)
    pub shutdown_timeout_secs: u64,
    /// Circuit breaker configuration
    #[serde(default)]
    pub breaker: BreakerConfig,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            poll_interval_ms: 500,
            shutdown_timeout_secs: 5,
            breaker: BreakerConfig::default(),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens (default: 5)
    pub failure_threshold: u32,
    /// Seconds the breaker stays open after the most recent over-threshold
    /// failure (default: 60)
    pub reset_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_secs: 60,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client per minute (default: 10)
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 10,
        }
    }
}
