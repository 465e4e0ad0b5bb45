use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{VerdictLabel, Video, VideoStatus};
use crate::pipeline::ClaimResult;

/// Counts over a video's terminal claim outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_claims: usize,
    pub verified: usize,
    pub insufficient_evidence: usize,
    pub failed: usize,
    /// Failed claims keyed by failure stage (`retrieval`, `timeout`, ...).
    pub failures_by_stage: BTreeMap<String, usize>,
    pub label_counts: BTreeMap<VerdictLabel, usize>,
    /// Mean verifier confidence over verified claims.
    pub mean_confidence: Option<f32>,
    /// Claims flagged as repeating an earlier claim of the same video.
    pub duplicate_claims: usize,
}

/// Final result for one video. Lists every claim, in decomposition order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoReport {
    pub video: Video,
    pub status: VideoStatus,
    pub summary: ReportSummary,
    pub claims: Vec<ClaimResult>,
}

impl VideoReport {
    pub fn video_id(&self) -> &str {
        &self.video.id
    }

    pub fn claim(&self, claim_id: &str) -> Option<&ClaimResult> {
        self.claims.iter().find(|r| r.claim.id == claim_id)
    }

    /// One-line digest used for the aggregator log entry.
    pub fn digest(&self) -> String {
        let s = &self.summary;
        format!(
            "status={} claims={} verified={} insufficient_evidence={} failed={}",
            self.status.as_str(),
            s.total_claims,
            s.verified,
            s.insufficient_evidence,
            s.failed
        )
    }
}
