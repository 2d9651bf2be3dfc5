use serde::{Deserialize, Serialize};

use super::candidate::DateCandidate;

pub const NO_DATE_MESSAGE: &str = "No date found in image";

/// Outcome of one inference request, shaped for the service layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryResult {
    pub success: bool,
    /// Canonical `YYYY-MM-DD`.
    pub expiry_date: Option<String>,
    /// Rounded to two decimals; 0.0 when no date was selected.
    pub confidence: f32,
    /// Concatenated OCR output, truncated. Diagnostic only.
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<DateCandidate>,
}

impl ExpiryResult {
    pub fn found(candidate: DateCandidate, raw_text: String) -> Self {
        Self {
            success: true,
            expiry_date: Some(candidate.normalized.to_string()),
            confidence: round2(candidate.confidence),
            raw_text,
            message: None,
            error: None,
            candidate: Some(candidate),
        }
    }

    /// Every pass ran, none produced a usable date.
    pub fn not_found(raw_text: String) -> Self {
        Self {
            success: false,
            expiry_date: None,
            confidence: 0.0,
            raw_text,
            message: Some(NO_DATE_MESSAGE.to_string()),
            error: None,
            candidate: None,
        }
    }

    /// The request could not be processed at all (e.g. undecodable image).
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            expiry_date: None,
            confidence: 0.0,
            raw_text: String::new(),
            message: None,
            error: Some(error.into()),
            candidate: None,
        }
    }

    pub fn is_hard_failure(&self) -> bool {
        self.error.is_some()
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}
