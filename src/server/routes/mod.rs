//! API routes for the document processing server

pub mod documents;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    // The body limit leaves headroom for multipart framing so an oversized
    // file is rejected by upload validation, not by a bare 413.
    let body_limit = max_upload_size + 64 * 1024;

    Router::new()
        .route(
            "/documents/upload",
            post(documents::upload_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/documents/:id", get(documents::get_document))
        .route("/documents/:id/text", get(documents::get_document_text))
        .route("/documents/:id/parse", post(documents::parse_document))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "docpipe",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document processing service with async text extraction",
        "endpoints": {
            "POST /api/documents/upload": "Upload a document for background extraction",
            "GET /api/documents/:id": "Get a document record and its status",
            "GET /api/documents/:id/text": "Get extracted text (plain, json or markdown)",
            "POST /api/documents/:id/parse": "Run the field parser over a completed document",
            "GET /health": "Service and dependency health"
        }
    }))
}
