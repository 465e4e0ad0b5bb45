//! Typed parsing of language-model output.
//!
//! Models wrap JSON in prose or code fences, so parsing looks for the outermost object first.
//! Anything that does not fit the expected shape is a [`ProviderError::MalformedResponse`].

use serde::Deserialize;
use serde_json::Value;

use crate::model::{ClaimType, VerdictLabel};

use super::error::ProviderError;
use super::types::{ExtractedClaim, VerifierResponse};

#[derive(Debug, Deserialize)]
struct DecompositionPayload {
    claims: Vec<RawClaim>,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    text: String,
    #[serde(default)]
    claim_type: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    label: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    citations: Vec<usize>,
}

/// Returns the slice between the first `{` and the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_object(text: &str) -> Result<Value, ProviderError> {
    let json = extract_json_object(text)
        .ok_or_else(|| ProviderError::malformed("no JSON object in model output"))?;
    serde_json::from_str(json).map_err(|e| ProviderError::malformed(format!("invalid JSON: {e}")))
}

/// Parses `{"claims": [{"text", "claim_type", "confidence"}]}`. Blank claims are dropped.
pub fn parse_decomposition(text: &str) -> Result<Vec<ExtractedClaim>, ProviderError> {
    let value = parse_object(text)?;
    let payload: DecompositionPayload = serde_json::from_value(value)
        .map_err(|e| ProviderError::malformed(format!("unexpected claims shape: {e}")))?;

    Ok(payload
        .claims
        .into_iter()
        .filter(|c| !c.text.trim().is_empty())
        .map(|c| ExtractedClaim {
            text: c.text.trim().to_string(),
            claim_type: c
                .claim_type
                .as_deref()
                .map(ClaimType::from_label)
                .unwrap_or(ClaimType::Other),
            confidence: c.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
        })
        .collect())
}

/// Parses a verdict object, optionally nested under `"verification"`.
///
/// Citation bounds are checked by the caller, which knows how much evidence was sent.
pub fn parse_verification(text: &str) -> Result<VerifierResponse, ProviderError> {
    let mut value = parse_object(text)?;
    if let Some(inner) = value.get_mut("verification") {
        value = inner.take();
    }

    let raw: RawVerdict = serde_json::from_value(value)
        .map_err(|e| ProviderError::malformed(format!("unexpected verdict shape: {e}")))?;

    let label = VerdictLabel::parse(&raw.label)
        .ok_or_else(|| ProviderError::malformed(format!("unknown label '{}'", raw.label)))?;

    Ok(VerifierResponse {
        label,
        confidence: raw
            .confidence
            .ok_or_else(|| ProviderError::malformed("missing confidence"))?,
        explanation: raw.explanation,
        citations: raw.citations,
    })
}
