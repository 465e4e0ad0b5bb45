use serde::{Deserialize, Serialize};

use crate::model::{ClaimType, VerdictLabel};

use super::error::ProviderError;

/// Speech-to-text output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

/// One claim as returned by decomposition, before it gets an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClaim {
    pub text: String,
    pub claim_type: ClaimType,
    pub confidence: f32,
}

impl ExtractedClaim {
    pub fn new(text: impl Into<String>, claim_type: ClaimType, confidence: f32) -> Self {
        Self {
            text: text.into(),
            claim_type,
            confidence,
        }
    }

    pub fn factual(text: impl Into<String>) -> Self {
        Self::new(text, ClaimType::Factual, 1.0)
    }
}

/// Raw search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Typed verifier answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierResponse {
    pub label: VerdictLabel,
    pub confidence: f32,
    pub explanation: String,
    /// Indices into the evidence list the verifier was given.
    pub citations: Vec<usize>,
}

impl VerifierResponse {
    /// Checks the response against the evidence it was produced from.
    ///
    /// Out-of-range citations or a confidence outside [0, 1] make the response malformed.
    pub fn validate(self, evidence_len: usize) -> Result<Self, ProviderError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ProviderError::malformed(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        if let Some(bad) = self.citations.iter().find(|&&idx| idx >= evidence_len) {
            return Err(ProviderError::malformed(format!(
                "citation {bad} out of range for {evidence_len} evidence items"
            )));
        }

        Ok(self)
    }
}
