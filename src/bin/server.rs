//! Document processing server binary
//!
//! Run with: cargo run --bin docpipe-server

use docpipe::config::AppConfig;
use docpipe::extraction::TextEngine;
use docpipe::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docpipe=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match std::env::var("DOCPIPE_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?,
        Err(_) => AppConfig::default(),
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - database: {}", config.storage.database_path.display());
    tracing::info!("  - max attempts: {}", config.processing.max_attempts);
    tracing::info!(
        "  - breaker: {} failures / {}s reset",
        config.processing.breaker.failure_threshold,
        config.processing.breaker.reset_timeout_secs
    );

    // OCR tooling is optional; warn early so scanned uploads don't surprise
    if !TextEngine::has_tesseract() {
        tracing::warn!("tesseract not found: image OCR and scanned-PDF fallback are disabled");
        tracing::warn!("  install with: apt install tesseract-ocr poppler-utils");
    } else if !TextEngine::has_pdftoppm() {
        tracing::warn!("pdftoppm not found: scanned-PDF fallback is disabled");
        tracing::warn!("  install with: apt install poppler-utils");
    }

    let server = Server::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}/api", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/documents/upload    - Upload a document");
    println!("  GET  /api/documents/:id       - Document status and results");
    println!("  GET  /api/documents/:id/text  - Extracted text");
    println!("  POST /api/documents/:id/parse - Field extraction");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
