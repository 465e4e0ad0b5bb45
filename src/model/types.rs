use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hashing::hash_to_u64;
use crate::provider::VerifierResponse;

/// Source video. Read-only once processing starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub transcript: String,
    pub duration_secs: Option<f64>,
    pub language: Option<String>,
}

impl Video {
    pub fn new(id: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transcript: transcript.into(),
            duration_secs: None,
            language: None,
        }
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Video-level processing status.
///
/// A video fails as a whole only when no claims could be produced (transcription or
/// decomposition). Individual claim failures never change this status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoStatus {
    Completed,
    Failed {
        stage: String,
        reason: String,
        detail: String,
    },
}

impl VideoStatus {
    pub fn failed(stage: &str, reason: &str, detail: impl Into<String>) -> Self {
        Self::Failed {
            stage: stage.to_string(),
            reason: reason.to_string(),
            detail: detail.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Factual,
    Statistical,
    Opinion,
    Other,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factual => "factual",
            Self::Statistical => "statistical",
            Self::Opinion => "opinion",
            Self::Other => "other",
        }
    }

    /// Lenient parse for model output. Unknown labels become [`ClaimType::Other`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "factual" | "fact" => Self::Factual,
            "statistical" | "statistic" | "numeric" => Self::Statistical,
            "opinion" | "subjective" => Self::Opinion,
            _ => Self::Other,
        }
    }
}

/// Atomic claim extracted from a transcript. Never mutated after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub video_id: String,
    /// Index in decomposition order.
    pub position: usize,
    pub text: String,
    pub claim_type: ClaimType,
    /// Extraction confidence in [0, 1].
    pub confidence: f32,
    /// BLAKE3 fingerprint of the normalized text.
    pub fingerprint: String,
    /// Identifier of an earlier claim in the same video with the same fingerprint.
    pub duplicate_of: Option<String>,
}

impl Claim {
    pub fn make_id(video_id: &str, position: usize) -> String {
        format!("{video_id}:c{position:03}")
    }
}

/// A ranked search hit attached to one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub claim_id: String,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub relevance_score: f32,
    /// Position in the merged retrieval order, before ranking.
    pub retrieval_position: usize,
    /// Zero-based position after ranking. Citations index by this.
    pub rank: usize,
}

impl Evidence {
    /// Retrieval position plus a short URL hash, so a re-run that finds a different source at
    /// the same position gets a different id.
    pub fn make_id(claim_id: &str, retrieval_position: usize, url: &str) -> String {
        let url_hash = hash_to_u64(url.as_bytes()) >> 32;
        format!("{claim_id}:e{retrieval_position:02}-{url_hash:08x}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictLabel {
    Supported,
    Refuted,
    NotEnoughEvidence,
}

impl VerdictLabel {
    pub const ALL: [VerdictLabel; 3] = [Self::Supported, Self::Refuted, Self::NotEnoughEvidence];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supported => "supported",
            Self::Refuted => "refuted",
            Self::NotEnoughEvidence => "not_enough_evidence",
        }
    }

    /// Parses the label vocabularies verifiers commonly answer with.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "supported" | "support" | "true" => Some(Self::Supported),
            "refuted" | "refute" | "false" | "contradicted" => Some(Self::Refuted),
            "not_enough_evidence" | "not_enough_info" | "nei" | "uncertain" | "unverifiable"
            | "inconclusive" => Some(Self::NotEnoughEvidence),
            _ => None,
        }
    }
}

impl std::fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one claim. Append-only: re-verification writes a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub id: String,
    pub claim_id: String,
    pub label: VerdictLabel,
    pub confidence: f32,
    pub explanation: String,
    /// Indices into the ranked evidence the verifier was given, in the verifier's order.
    pub citations: Vec<usize>,
    /// Ids of the cited evidence, in citation order. Stays valid after the claim's evidence
    /// is replaced by a later run.
    #[serde(default)]
    pub evidence_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Verification {
    /// `evidence` is the ranked list the verifier saw; out-of-range citations resolve to no id.
    pub fn from_response(
        claim_id: impl Into<String>,
        response: VerifierResponse,
        evidence: &[Evidence],
    ) -> Self {
        let evidence_ids = response
            .citations
            .iter()
            .filter_map(|&idx| evidence.get(idx))
            .map(|e| e.id.clone())
            .collect();
        Self {
            id: Uuid::new_v4().to_string(),
            claim_id: claim_id.into(),
            label: response.label,
            confidence: response.confidence,
            explanation: response.explanation,
            citations: response.citations,
            evidence_ids,
            created_at: Utc::now(),
        }
    }

    /// The cited items present in `evidence`, in citation order. Evidence from another run
    /// does not match.
    pub fn cited_evidence<'a>(&self, evidence: &'a [Evidence]) -> Vec<&'a Evidence> {
        self.evidence_ids
            .iter()
            .filter_map(|id| evidence.iter().find(|e| &e.id == id))
            .collect()
    }
}
