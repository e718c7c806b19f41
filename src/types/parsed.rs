//! Structured output of the rules-based field parser

use serde::{Deserialize, Serialize};

/// Fields extracted from a completed document's text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedData {
    /// Parser that produced this result (invoice, receipt, contract)
    pub document_type: String,
    /// Extracted fields keyed by name
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Problems found while parsing, e.g. "No fields extracted"
    #[serde(default)]
    pub validation_errors: Vec<String>,
    /// Confidence in [0, 1], grows with each matched field
    pub parsing_confidence: f32,
}
