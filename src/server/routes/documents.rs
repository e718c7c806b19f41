//! Document upload, status, text and parse endpoints

use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::parsing::ParserType;
use crate::server::state::AppState;
use crate::types::document::{DocumentRecord, DocumentStatus, FileType};
use crate::types::parsed::ParsedData;

/// Response from a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub status: DocumentStatus,
}

/// Sanitized document record for API responses
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub document_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub file_size: u64,
    pub status: DocumentStatus,
    pub raw_text: String,
    pub parsed_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(doc: DocumentRecord) -> Self {
        Self {
            document_id: doc.id,
            file_name: doc.file_name,
            file_type: doc.file_type,
            file_size: doc.file_size,
            status: doc.status,
            raw_text: doc.raw_text.unwrap_or_default(),
            parsed_data: doc.parsed_data,
            error_message: doc.error_message,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// POST /api/documents/upload - accept a file and queue it for extraction
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid multipart body: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(format!("failed to read file: {}", e)))?;
        upload = Some((filename, data.to_vec()));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| Error::Validation("No file provided".to_string()))?;

    let file_type = validate_upload(&file_name, data.len(), state.config().server.max_upload_size)?;

    let record = state.store().create(&file_name, file_type, data.len() as u64)?;
    tracing::info!(
        "accepted {} ({} bytes) as document {}",
        file_name,
        data.len(),
        record.id
    );

    // Ensure the worker is running, then hand the job off.
    state.pipeline().start();
    state.pipeline().enqueue(record.id, file_type, data)?;

    Ok(Json(UploadResponse {
        document_id: record.id,
        status: record.status,
    }))
}

/// Extension and size checks applied before a document record is created
fn validate_upload(file_name: &str, size: usize, max_size: usize) -> Result<FileType> {
    let ext = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    let file_type = FileType::from_extension(ext).ok_or_else(|| {
        Error::Validation("Unsupported file type. Allowed: pdf, png, jpg, docx".to_string())
    })?;

    if size > max_size {
        return Err(Error::Validation(format!(
            "File too large. Max {}MB",
            max_size / (1024 * 1024)
        )));
    }

    Ok(file_type)
}

/// GET /api/documents/:id - fetch a document record
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>> {
    let doc = state
        .store()
        .get(&document_id)?
        .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;
    Ok(Json(doc.into()))
}

/// Output format for extracted text
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Plain,
    Json,
    Markdown,
}

#[derive(Debug, Deserialize)]
pub struct TextQuery {
    #[serde(default)]
    pub format: TextFormat,
}

/// GET /api/documents/:id/text - extracted text of a completed document
pub async fn get_document_text(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(query): Query<TextQuery>,
) -> Result<Response> {
    let doc = state
        .store()
        .get(&document_id)?
        .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

    if doc.status != DocumentStatus::Completed {
        return Err(Error::Conflict(format!(
            "Document status is {}",
            doc.status
        )));
    }

    let text = match state.text_cache().get(&document_id) {
        Some(cached) => cached,
        None => {
            let text = doc.raw_text.unwrap_or_default().trim().to_string();
            state.text_cache().insert(document_id, text.clone());
            text
        }
    };

    let response = match query.format {
        TextFormat::Plain => text.into_response(),
        TextFormat::Json => Json(serde_json::json!({
            "document_id": document_id,
            "text": text,
        }))
        .into_response(),
        TextFormat::Markdown => {
            format!("# Document {}\n\n````\n{}\n````", document_id, text).into_response()
        }
    };

    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct ParseQuery {
    pub parser_type: ParserType,
}

/// POST /api/documents/:id/parse - run the field parser over extracted text
pub async fn parse_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(query): Query<ParseQuery>,
) -> Result<Json<ParsedData>> {
    let doc = state
        .store()
        .get(&document_id)?
        .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

    if doc.status != DocumentStatus::Completed {
        return Err(Error::Conflict(format!(
            "Document status is {}",
            doc.status
        )));
    }

    let text = doc.raw_text.unwrap_or_default();
    let parsed = state.parser().parse(query.parser_type, &text);

    let parsed_value = serde_json::to_value(&parsed)
        .map_err(|e| Error::Internal(format!("failed to serialize parsed data: {}", e)))?;
    state
        .store()
        .update_status(&document_id, doc.status, None, None, Some(&parsed_value))?;

    Ok(Json(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 10 * 1024 * 1024;

    #[test]
    fn validate_accepts_known_extensions() {
        assert_eq!(validate_upload("a.pdf", 10, MAX).unwrap(), FileType::Pdf);
        assert_eq!(validate_upload("a.PNG", 10, MAX).unwrap(), FileType::Png);
        assert_eq!(validate_upload("photo.jpeg", 10, MAX).unwrap(), FileType::Jpg);
        assert_eq!(validate_upload("doc.docx", 10, MAX).unwrap(), FileType::Docx);
    }

    #[test]
    fn validate_rejects_unknown_or_missing_extension() {
        for name in ["notes.txt", "archive.tar.gz", "no-extension"] {
            let err = validate_upload(name, 10, MAX).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Unsupported file type. Allowed: pdf, png, jpg, docx"
            );
        }
    }

    #[test]
    fn validate_rejects_oversize_files() {
        let err = validate_upload("big.pdf", MAX + 1, MAX).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Max 10MB");
        // at the limit is still fine
        assert!(validate_upload("ok.pdf", MAX, MAX).is_ok());
    }
}
