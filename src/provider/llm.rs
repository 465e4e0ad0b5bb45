use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::{Client, webc};
use tracing::debug;

use crate::model::Evidence;

use super::error::{ProviderError, parse_retry_after};
use super::parse::{parse_decomposition, parse_verification};
use super::types::{ExtractedClaim, VerifierResponse};
use super::{ClaimDecomposer, Verifier};

pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

const DECOMPOSE_SYSTEM: &str = "You extract atomic, checkable factual claims from video \
transcripts. Answer with JSON only: {\"claims\": [{\"text\": string, \"claim_type\": \
\"factual\"|\"statistical\"|\"opinion\"|\"other\", \"confidence\": number between 0 and 1}]}. \
Each claim must stand alone without the transcript. Return an empty list when there is \
nothing to check.";

const VERIFY_SYSTEM: &str = "You judge a claim against numbered evidence. Answer with JSON \
only: {\"label\": \"supported\"|\"refuted\"|\"not_enough_evidence\", \"confidence\": number \
between 0 and 1, \"explanation\": string, \"citations\": [evidence numbers you relied on]}. \
Cite only numbers that appear in the evidence list.";

/// Language-model backed decomposer and verifier.
#[derive(Clone)]
pub struct GenaiClaimService {
    client: Client,
    model: String,
    options: ChatOptions,
}

impl std::fmt::Debug for GenaiClaimService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiClaimService")
            .field("model", &self.model)
            .finish()
    }
}

impl GenaiClaimService {
    pub fn new(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            options: ChatOptions::default().with_temperature(DEFAULT_TEMPERATURE),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, ProviderError> {
        let request = ChatRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)]);

        let resp = self
            .client
            .exec_chat(&self.model, request, Some(&self.options))
            .await
            .map_err(|e| classify_genai(&e))?;

        let text = resp.first_text().unwrap_or_default().to_string();
        debug!(model = %self.model, response_len = text.len(), "Model responded");

        if text.trim().is_empty() {
            return Err(ProviderError::malformed("empty model response"));
        }
        Ok(text)
    }
}

/// Renders evidence as a numbered list. Numbers are the citation indices.
pub fn render_evidence(evidence: &[Evidence]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{i}] {}\n{}\n{}", e.title, e.url, e.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// HTTP failures classify by status like every other provider; 4xx other than 408 and 429
/// is permanent.
pub(crate) fn classify_genai(err: &genai::Error) -> ProviderError {
    let webc_error = match err {
        genai::Error::WebModelCall { webc_error, .. }
        | genai::Error::WebAdapterCall { webc_error, .. } => webc_error,
        other => return classify_genai_error(&other.to_string()),
    };

    match webc_error {
        webc::Error::ResponseFailedStatus {
            status,
            body,
            headers,
        } => {
            let retry_after = parse_retry_after(
                headers
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            ProviderError::from_status(status.as_u16(), retry_after, body)
        }
        webc::Error::Reqwest(e) => ProviderError::from_reqwest(e),
        other => classify_genai_error(&other.to_string()),
    }
}

/// Fallback for failures genai only reports as text.
pub(crate) fn classify_genai_error(message: &str) -> ProviderError {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("resource_exhausted")
    {
        ProviderError::RateLimited { retry_after: None }
    } else if lower.contains("400")
        || lower.contains("401")
        || lower.contains("403")
        || lower.contains("404")
        || lower.contains("bad request")
        || lower.contains("invalid")
        || lower.contains("api key")
        || lower.contains("unauthorized")
        || lower.contains("model not found")
    {
        ProviderError::permanent(message)
    } else if lower.contains("timed out") || lower.contains("timeout") {
        ProviderError::Timeout { elapsed_ms: 0 }
    } else {
        ProviderError::transient(message)
    }
}

#[async_trait]
impl ClaimDecomposer for GenaiClaimService {
    async fn decompose(&self, transcript: &str) -> Result<Vec<ExtractedClaim>, ProviderError> {
        let text = self
            .complete(DECOMPOSE_SYSTEM, format!("Transcript:\n{transcript}"))
            .await?;
        parse_decomposition(&text)
    }
}

#[async_trait]
impl Verifier for GenaiClaimService {
    async fn verify(
        &self,
        claim: &str,
        evidence: &[Evidence],
    ) -> Result<VerifierResponse, ProviderError> {
        let user = format!(
            "Claim: {claim}\n\nEvidence:\n{}",
            render_evidence(evidence)
        );
        let text = self.complete(VERIFY_SYSTEM, user).await?;
        parse_verification(&text)
    }
}
