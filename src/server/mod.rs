//! HTTP server for the document processing service

pub mod cache;
pub mod ratelimit;
pub mod routes;
pub mod state;

use axum::{extract::State, middleware, routing::get, Json, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::extraction::TextEngine;
use state::AppState;

/// Document processing HTTP server
pub struct Server {
    config: AppConfig,
    state: AppState,
}

impl Server {
    /// Create a new server
    pub fn new(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create a server over pre-built state (tests, embedding)
    pub fn with_state(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes
    fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            // Health check
            .route("/health", get(health_check))
            // API routes with body limit for multipart uploads
            .nest("/api", routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            // Middleware layers (order matters - applied bottom to top)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                ratelimit::rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors)
    }

    /// Start the worker and serve until shutdown, then drain the pipeline
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid address: {}", e)))?;

        self.state.pipeline().start();

        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind {}: {}", addr, e)))?;

        tracing::info!("listening on http://{}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("server error: {}", e)))?;

        // Finish the in-flight job (bounded) before exiting.
        self.state.pipeline().stop().await;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}

/// Health check endpoint: database plus extraction tooling
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match state.store().ping() {
        Ok(()) => "ok",
        Err(e) => {
            tracing::error!("health check database ping failed: {}", e);
            "failed"
        }
    };

    let tesseract = if TextEngine::has_tesseract() { "ok" } else { "missing" };
    let pdftoppm = if TextEngine::has_pdftoppm() { "ok" } else { "missing" };

    let status = if database != "ok" {
        "failed"
    } else if tesseract != "ok" || pdftoppm != "ok" {
        // direct PDF extraction still works, but OCR paths are unavailable
        "degraded"
    } else {
        "ok"
    };

    Json(serde_json::json!({
        "status": status,
        "dependencies": {
            "database": database,
            "pdf_extract": "ok",
            "tesseract": tesseract,
            "pdftoppm": pdftoppm,
        }
    }))
}
