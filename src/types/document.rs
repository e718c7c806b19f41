//! Document records and the processing status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported file types
///
/// This is a closed set: anything else is rejected at upload validation and
/// never reaches the extraction pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// PNG image
    Png,
    /// JPEG image (`jpeg` uploads normalize to this)
    Jpg,
    /// Microsoft Word document (.docx)
    Docx,
}

impl FileType {
    /// Detect file type from an upload extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Canonical lowercase name, as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Docx => "docx",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        Self::from_extension(s)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document processing status
///
/// Transitions driven by the worker: `Pending` → `Processing` →
/// `Completed`/`Failed`. Re-entering `Processing` on a retry attempt is
/// expected; the persisted status does not encode the attempt number.
/// `Completed` and `Failed` are terminal for this subsystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    /// Canonical lowercase name, as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether the worker is done with a document in this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document as stored in the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded
    pub file_name: String,
    /// Detected file type
    pub file_type: FileType,
    /// File size in bytes
    pub file_size: u64,
    /// Current processing status
    pub status: DocumentStatus,
    /// Extracted text, set once on successful extraction and never cleared
    pub raw_text: Option<String>,
    /// Structured fields attached by the parse endpoint
    pub parsed_data: Option<serde_json::Value>,
    /// Present exactly when `status` is `Failed`
    pub error_message: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last status change timestamp
    pub updated_at: DateTime<Utc>,
}

/// One entry in the append-only processing audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingLogEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    /// Action name, e.g. `create_document` or `update_status`
    pub action: String,
    /// Document status after the action
    pub status: DocumentStatus,
    /// Free-form detail (error message, filename)
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
