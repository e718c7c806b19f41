//! Rules-based field extraction from completed documents
//!
//! A small regex-driven parser that pulls typed fields out of extracted text.
//! It runs after extraction as a separate step and never feeds back into the
//! processing state machine.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::types::parsed::ParsedData;

/// Supported parser rule sets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParserType {
    Invoice,
    Receipt,
    Contract,
}

impl ParserType {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
            Self::Contract => "contract",
        }
    }
}

/// Regex-based field parser
pub struct FieldParser {
    amount: Regex,
    date: Regex,
    vendor: Regex,
    party: Regex,
    term: Regex,
}

impl Default for FieldParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldParser {
    /// Compile the rule patterns
    pub fn new() -> Self {
        Self {
            amount: Regex::new(r"(?i)(total|amount)[:\s\$]*([0-9]+(?:\.[0-9]{2})?)")
                .expect("amount pattern"),
            date: Regex::new(r"(\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{4})").expect("date pattern"),
            vendor: Regex::new(r"(?i)(from|vendor|seller)[:\s]+([A-Za-z0-9 &,-]{3,})")
                .expect("vendor pattern"),
            party: Regex::new(r"(?i)(between|by and between)\s+([A-Za-z0-9 &,-]{3,})")
                .expect("party pattern"),
            term: Regex::new(r"(?i)term[:\s]+(\d+\s+(months?|years?))").expect("term pattern"),
        }
    }

    /// Extract fields from `text` according to the given rule set
    ///
    /// Confidence starts at 0.5 and grows with each matched field, clamped to
    /// [0, 1]. When nothing matches, a "No fields extracted" validation error
    /// is recorded instead.
    pub fn parse(&self, parser_type: ParserType, text: &str) -> ParsedData {
        let mut fields = Map::new();
        let mut validation_errors = Vec::new();
        let mut confidence = 0.5f32;

        match parser_type {
            ParserType::Invoice | ParserType::Receipt => {
                if let Some(caps) = self.amount.captures(text) {
                    if let Ok(amount) = caps[2].parse::<f64>() {
                        fields.insert("total_amount".to_string(), json!(amount));
                        confidence += 0.2;
                    }
                }
                if let Some(caps) = self.date.captures(text) {
                    fields.insert("date".to_string(), json!(caps[1].to_string()));
                    confidence += 0.1;
                }
                if let Some(caps) = self.vendor.captures(text) {
                    fields.insert("vendor".to_string(), json!(caps[2].trim()));
                    confidence += 0.1;
                }
                if fields.is_empty() {
                    validation_errors.push("No fields extracted".to_string());
                }
            }
            ParserType::Contract => {
                let parties: Vec<Value> = self
                    .party
                    .captures_iter(text)
                    .map(|caps| json!(caps[2].trim()))
                    .collect();
                if !parties.is_empty() {
                    fields.insert("parties".to_string(), Value::Array(parties));
                    confidence += 0.2;
                }
                if let Some(caps) = self.term.captures(text) {
                    fields.insert("term".to_string(), json!(caps[1].to_string()));
                    confidence += 0.1;
                }
                if fields.is_empty() {
                    validation_errors.push("No fields extracted".to_string());
                }
            }
        }

        ParsedData {
            document_type: parser_type.as_str().to_string(),
            fields,
            validation_errors,
            parsing_confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_extracts_amount_date_and_vendor() {
        let parser = FieldParser::new();
        let text = "Vendor: ACME Corp\nDate 2024-03-15\nTotal: $149.99";
        let parsed = parser.parse(ParserType::Invoice, text);

        assert_eq!(parsed.document_type, "invoice");
        assert_eq!(parsed.fields["total_amount"], json!(149.99));
        assert_eq!(parsed.fields["date"], json!("2024-03-15"));
        assert_eq!(parsed.fields["vendor"], json!("ACME Corp"));
        assert!(parsed.validation_errors.is_empty());
        assert!((parsed.parsing_confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn receipt_with_partial_fields_scores_lower() {
        let parser = FieldParser::new();
        let parsed = parser.parse(ParserType::Receipt, "amount 20.00, thanks!");

        assert_eq!(parsed.fields["total_amount"], json!(20.0));
        assert!(!parsed.fields.contains_key("vendor"));
        assert!((parsed.parsing_confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn contract_collects_all_parties_and_term() {
        let parser = FieldParser::new();
        let text =
            "Agreement between Alpha Ltd. Executed by and between Beta LLC. Term: 24 months of service.";
        let parsed = parser.parse(ParserType::Contract, text);

        let parties = parsed.fields["parties"].as_array().unwrap();
        assert_eq!(parties, &vec![json!("Alpha Ltd"), json!("Beta LLC")]);
        assert_eq!(parsed.fields["term"], json!("24 months"));
        assert!(parsed.validation_errors.is_empty());
    }

    #[test]
    fn unmatched_text_reports_no_fields() {
        let parser = FieldParser::new();
        let parsed = parser.parse(ParserType::Invoice, "nothing useful here");

        assert!(parsed.fields.is_empty());
        assert_eq!(parsed.validation_errors, vec!["No fields extracted"]);
        assert!((parsed.parsing_confidence - 0.5).abs() < 1e-6);
    }
}
