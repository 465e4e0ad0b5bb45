use crate::model::{Video, VideoStatus};
use crate::pipeline::{ClaimOutcome, ClaimResult};

use super::types::{ReportSummary, VideoReport};

/// Builds the video report from terminal claim results.
///
/// Pure: results are ordered by claim position, never by completion order, so aggregating
/// the same results (or an already aggregated report's claims) gives the same report.
pub fn aggregate(video: Video, status: VideoStatus, mut results: Vec<ClaimResult>) -> VideoReport {
    results.sort_by(|a, b| {
        a.claim
            .position
            .cmp(&b.claim.position)
            .then_with(|| a.claim.id.cmp(&b.claim.id))
    });

    let summary = summarize(&results);

    VideoReport {
        video,
        status,
        summary,
        claims: results,
    }
}

pub fn summarize(results: &[ClaimResult]) -> ReportSummary {
    let mut summary = ReportSummary {
        total_claims: results.len(),
        ..Default::default()
    };
    let mut confidence_sum = 0.0f32;

    for result in results {
        if result.claim.duplicate_of.is_some() {
            summary.duplicate_claims += 1;
        }

        match &result.outcome {
            ClaimOutcome::Verified { verification } => {
                summary.verified += 1;
                *summary.label_counts.entry(verification.label).or_default() += 1;
                confidence_sum += verification.confidence;
            }
            ClaimOutcome::InsufficientEvidence => summary.insufficient_evidence += 1,
            ClaimOutcome::Failed { failure } => {
                summary.failed += 1;
                *summary
                    .failures_by_stage
                    .entry(failure.stage.as_str().to_string())
                    .or_default() += 1;
            }
        }
    }

    if summary.verified > 0 {
        summary.mean_confidence = Some(confidence_sum / summary.verified as f32);
    }

    summary
}
