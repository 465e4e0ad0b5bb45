use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::cancel::{CancelReason, CancelToken};
use crate::client::{Capability, ClientConfig, ClientError, RateLimitedClient};
use crate::metrics::{LogRecorder, LogStatus, RunLog};
use crate::model::{Claim, ClaimType, Evidence, VerdictLabel, Verification};
use crate::provider::{
    MockSearch, MockVerifier, ProviderError, SearchHit, VerifierResponse,
};
use crate::ranking::{EvidenceRanker, RankerConfig, RelevanceScorer};

/// Scores a hit by the number after `score=` in its snippet.
struct SnippetScorer;

impl RelevanceScorer for SnippetScorer {
    fn score(&self, _claim: &str, hit: &SearchHit) -> f32 {
        hit.snippet
            .split_once("score=")
            .and_then(|(_, s)| s.parse().ok())
            .unwrap_or(0.0)
    }
}

fn claim(text: &str) -> Claim {
    Claim {
        id: Claim::make_id("v1", 0),
        video_id: "v1".to_string(),
        position: 0,
        text: text.to_string(),
        claim_type: ClaimType::Factual,
        confidence: 1.0,
        fingerprint: crate::hashing::claim_fingerprint(text),
        duplicate_of: None,
    }
}

fn hit(n: usize, score: f32) -> SearchHit {
    SearchHit::new(
        format!("Result {n}"),
        format!("https://example.org/{n}"),
        format!("score={score}"),
    )
}

fn evidence(n: usize) -> Evidence {
    Evidence {
        id: Evidence::make_id("v1:c000", n, &format!("https://example.org/{n}")),
        claim_id: "v1:c000".to_string(),
        title: format!("Result {n}"),
        url: format!("https://example.org/{n}"),
        snippet: String::new(),
        relevance_score: 0.8,
        retrieval_position: n,
        rank: n,
    }
}

fn policy() -> ClientConfig {
    ClientConfig {
        max_in_flight: 4,
        max_attempts: 3,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(2),
        jitter: Duration::ZERO,
        call_timeout: Duration::from_secs(5),
    }
}

struct Harness {
    pipeline: ClaimPipeline,
    search: Arc<MockSearch>,
    verifier: Arc<MockVerifier>,
    recorder: Arc<LogRecorder>,
}

fn harness(search: MockSearch, verifier: MockVerifier, top_k: usize, queries: usize) -> Harness {
    let recorder = Arc::new(LogRecorder::new(1_000));
    let search = Arc::new(search);
    let verifier = Arc::new(verifier);
    let ranker = EvidenceRanker::new(
        Arc::new(SnippetScorer),
        RankerConfig {
            top_k,
            min_score: 0.3,
        },
    );
    let pipeline = ClaimPipeline::new(
        search.clone(),
        verifier.clone(),
        Arc::new(RateLimitedClient::new(
            Capability::Search,
            policy(),
            recorder.clone(),
        )),
        Arc::new(RateLimitedClient::new(
            Capability::Verification,
            policy(),
            recorder.clone(),
        )),
        ranker,
        queries,
    );
    Harness {
        pipeline,
        search,
        verifier,
        recorder,
    }
}

fn verification() -> Verification {
    Verification::from_response(
        "v1:c000",
        VerifierResponse {
            label: VerdictLabel::Supported,
            confidence: 0.9,
            explanation: "matches".to_string(),
            citations: vec![0],
        },
        &[evidence(0)],
    )
}

fn exhausted() -> ClientError {
    ClientError::Exhausted {
        capability: Capability::Search,
        attempts: 4,
        last: ProviderError::Timeout { elapsed_ms: 30_000 },
    }
}

// -- transition -------------------------------------------------------------

#[test]
fn test_transition_happy_path() {
    let state = transition(ClaimState::Retrieving, StageEvent::Retrieved(vec![hit(0, 0.9)]));
    assert!(matches!(state, ClaimState::Ranking { .. }));

    let state = transition(state, StageEvent::Ranked(vec![evidence(0)]));
    assert!(matches!(state, ClaimState::Verifying { .. }));

    let state = transition(state, StageEvent::Verified(verification()));
    match state {
        ClaimState::Verified { evidence, .. } => assert_eq!(evidence.len(), 1),
        other => panic!("expected verified, got {other:?}"),
    }
}

#[test]
fn test_transition_empty_results_are_insufficient() {
    assert_eq!(
        transition(ClaimState::Retrieving, StageEvent::Retrieved(vec![])),
        ClaimState::InsufficientEvidence
    );
    assert_eq!(
        transition(
            ClaimState::Ranking {
                hits: vec![hit(0, 0.1)]
            },
            StageEvent::Ranked(vec![])
        ),
        ClaimState::InsufficientEvidence
    );
}

#[test]
fn test_transition_stage_failure_is_attributed() {
    let state = transition(ClaimState::Retrieving, StageEvent::StageFailed(exhausted()));
    match state {
        ClaimState::Failed { failure, evidence } => {
            assert_eq!(failure.stage, FailureStage::Retrieval);
            assert_eq!(failure.reason, "timeout");
            assert_eq!(failure.during, Stage::Retrieval);
            assert!(evidence.is_empty());
        }
        other => panic!("expected failed, got {other:?}"),
    }
}

#[test]
fn test_transition_verification_failure_keeps_evidence() {
    let err = ClientError::Permanent {
        capability: Capability::Verification,
        error: ProviderError::permanent("bad request"),
    };
    let state = transition(
        ClaimState::Verifying {
            evidence: vec![evidence(0), evidence(1)],
        },
        StageEvent::StageFailed(err),
    );
    match state {
        ClaimState::Failed { failure, evidence } => {
            assert_eq!(failure.stage, FailureStage::Verification);
            assert_eq!(failure.reason, "permanent");
            assert_eq!(evidence.len(), 2);
        }
        other => panic!("expected failed, got {other:?}"),
    }
}

#[test]
fn test_transition_cancellation_maps_to_timeout_or_cancelled() {
    let deadline = transition(
        ClaimState::Retrieving,
        StageEvent::Interrupted(CancelReason::ClaimDeadline),
    );
    match deadline {
        ClaimState::Failed { failure, .. } => {
            assert_eq!(failure.stage, FailureStage::Timeout);
            assert_eq!(failure.reason, "claim_deadline");
        }
        other => panic!("expected failed, got {other:?}"),
    }

    let aborted = transition(
        ClaimState::Verifying {
            evidence: vec![evidence(0)],
        },
        StageEvent::StageFailed(ClientError::Cancelled {
            capability: Capability::Verification,
            reason: CancelReason::Aborted,
        }),
    );
    match aborted {
        ClaimState::Failed { failure, evidence } => {
            assert_eq!(failure.stage, FailureStage::Cancelled);
            assert_eq!(failure.reason, "aborted");
            assert_eq!(failure.during, Stage::Verification);
            assert_eq!(evidence.len(), 1);
        }
        other => panic!("expected failed, got {other:?}"),
    }
}

#[test]
fn test_transition_terminal_states_absorb() {
    let terminal = ClaimState::InsufficientEvidence;
    assert_eq!(
        transition(terminal.clone(), StageEvent::Retrieved(vec![hit(0, 1.0)])),
        terminal
    );

    let verified = ClaimState::Verified {
        evidence: vec![evidence(0)],
        verification: verification(),
    };
    assert_eq!(
        transition(
            verified.clone(),
            StageEvent::Interrupted(CancelReason::Aborted)
        ),
        verified
    );
}

#[test]
fn test_transition_mismatched_event_fails_current_stage() {
    let state = transition(ClaimState::Retrieving, StageEvent::Verified(verification()));
    match state {
        ClaimState::Failed { failure, .. } => {
            assert_eq!(failure.stage, FailureStage::Retrieval);
            assert_eq!(failure.reason, "invalid_transition");
        }
        other => panic!("expected failed, got {other:?}"),
    }
}

// -- queries ----------------------------------------------------------------

#[test]
fn test_build_queries_full_then_keywords() {
    let queries = build_queries("  The   moon is made of cheese ", 2);
    assert_eq!(queries, vec!["The moon is made of cheese", "moon made cheese"]);
}

#[test]
fn test_build_queries_respects_limit() {
    assert_eq!(build_queries("The moon is made of cheese", 1).len(), 1);
    assert_eq!(build_queries("The moon is made of cheese", 0).len(), 1);
}

#[test]
fn test_build_queries_skips_identical_reduction() {
    assert_eq!(build_queries("unemployment fell", 3), vec!["unemployment fell"]);
}

#[test]
fn test_build_queries_blank_claim() {
    assert!(build_queries("   ", 2).is_empty());
}

// -- pipeline ---------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_run_verifies_with_ranked_evidence() {
    let h = harness(
        MockSearch::returning(vec![hit(0, 0.5), hit(1, 0.9), hit(2, 0.7)]),
        MockVerifier::answering(VerdictLabel::Supported, 0.8),
        2,
        1,
    );

    let log = RunLog::new();
    let result = h
        .pipeline
        .run(&claim("Water boils at 100C"), &log, &CancelToken::new())
        .await;

    let verification = result.verification().expect("verified");
    assert_eq!(verification.evidence_ids, vec![result.evidence[0].id.clone()]);
    assert_eq!(log.entries(), h.recorder.entries());
    assert_eq!(verification.label, VerdictLabel::Supported);
    assert_eq!(result.evidence.len(), 2);
    assert_eq!(result.evidence[0].url, "https://example.org/1");
    assert_eq!(result.evidence[0].rank, 0);
    assert_eq!(result.evidence[1].url, "https://example.org/2");
    assert_eq!(verification.cited_evidence(&result.evidence).len(), 1);

    let components: Vec<_> = h
        .recorder
        .entries()
        .iter()
        .map(|e| e.component.clone())
        .collect();
    assert_eq!(components, vec!["evidence_retrieval", "verification"]);
}

#[tokio::test(start_paused = true)]
async fn test_run_zero_hits_is_insufficient_without_verifier_call() {
    let h = harness(
        MockSearch::empty(),
        MockVerifier::answering(VerdictLabel::Supported, 0.8),
        3,
        1,
    );

    let result = h
        .pipeline
        .run(&claim("Nothing to find"), &RunLog::new(), &CancelToken::new())
        .await;

    assert_eq!(result.outcome, ClaimOutcome::InsufficientEvidence);
    assert!(result.evidence.is_empty());
    assert_eq!(h.verifier.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_all_hits_below_min_score_is_insufficient() {
    let h = harness(
        MockSearch::returning(vec![hit(0, 0.1), hit(1, 0.2)]),
        MockVerifier::answering(VerdictLabel::Supported, 0.8),
        3,
        1,
    );

    let result = h.pipeline.run(&claim("Weak evidence"), &RunLog::new(), &CancelToken::new()).await;

    assert_eq!(result.outcome, ClaimOutcome::InsufficientEvidence);
    assert_eq!(h.verifier.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_merges_queries_and_dedups_urls() {
    let h = harness(
        MockSearch::new(|query| {
            if query.contains(' ') && query.starts_with("The") {
                Ok(vec![hit(0, 0.9), hit(1, 0.8)])
            } else {
                Ok(vec![hit(1, 0.8), hit(2, 0.6)])
            }
        }),
        MockVerifier::answering(VerdictLabel::Refuted, 0.7),
        5,
        2,
    );

    let result = h
        .pipeline
        .run(&claim("The moon is made of cheese"), &RunLog::new(), &CancelToken::new())
        .await;

    assert_eq!(h.search.calls(), 2);
    let urls: Vec<_> = result.evidence.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.org/0",
            "https://example.org/1",
            "https://example.org/2"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_retrieval_timeout_fails_with_attributed_stage() {
    let h = harness(
        MockSearch::returning(vec![hit(0, 0.9)]).with_delay(Duration::from_secs(10)),
        MockVerifier::answering(VerdictLabel::Supported, 0.8),
        3,
        1,
    );

    let result = h.pipeline.run(&claim("Slow search"), &RunLog::new(), &CancelToken::new()).await;

    let failure = result.failure().expect("failed");
    assert_eq!(failure.stage, FailureStage::Retrieval);
    assert_eq!(failure.reason, "timeout");
    assert_eq!(h.search.calls(), 3);
    let entries = h.recorder.entries_for_claim("v1:c000");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].status, LogStatus::Failure);
}

#[tokio::test(start_paused = true)]
async fn test_run_verification_failure_keeps_ranked_evidence() {
    let h = harness(
        MockSearch::returning(vec![hit(0, 0.9), hit(1, 0.8)]),
        MockVerifier::new(|_, _| Err(ProviderError::permanent("quota exceeded"))),
        3,
        1,
    );

    let result = h.pipeline.run(&claim("Quota claim"), &RunLog::new(), &CancelToken::new()).await;

    let failure = result.failure().expect("failed");
    assert_eq!(failure.stage, FailureStage::Verification);
    assert_eq!(failure.reason, "permanent");
    assert_eq!(result.evidence.len(), 2);
    assert_eq!(h.verifier.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_out_of_range_citation_is_retried_once_then_fails() {
    let h = harness(
        MockSearch::returning(vec![hit(0, 0.9)]),
        MockVerifier::new(|_, _| {
            Ok(VerifierResponse {
                label: VerdictLabel::Supported,
                confidence: 0.9,
                explanation: "cites a ghost".to_string(),
                citations: vec![4],
            })
        }),
        3,
        1,
    );

    let result = h
        .pipeline
        .run(&claim("Ghost citation"), &RunLog::new(), &CancelToken::new())
        .await;

    let failure = result.failure().expect("failed");
    assert_eq!(failure.stage, FailureStage::Verification);
    assert_eq!(failure.reason, "malformed_response");
    assert_eq!(h.verifier.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_already_cancelled_makes_no_calls() {
    let h = harness(
        MockSearch::returning(vec![hit(0, 0.9)]),
        MockVerifier::answering(VerdictLabel::Supported, 0.8),
        3,
        1,
    );
    let cancel = CancelToken::new();
    cancel.cancel(CancelReason::Aborted);

    let result = h.pipeline.run(&claim("Never runs"), &RunLog::new(), &cancel).await;

    let failure = result.failure().expect("failed");
    assert_eq!(failure.stage, FailureStage::Cancelled);
    assert_eq!(failure.during, Stage::Retrieval);
    assert_eq!(h.search.calls(), 0);
    assert!(h.recorder.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_cancel_during_verification_discards_result() {
    let h = harness(
        MockSearch::returning(vec![hit(0, 0.9)]),
        MockVerifier::answering(VerdictLabel::Supported, 0.8).with_delay(Duration::from_secs(2)),
        3,
        1,
    );
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel(CancelReason::ClaimDeadline);
    });

    let result = h.pipeline.run(&claim("Slow verifier"), &RunLog::new(), &cancel).await;

    assert!(result.verification().is_none());
    let failure = result.failure().expect("failed");
    assert_eq!(failure.stage, FailureStage::Timeout);
    assert_eq!(failure.during, Stage::Verification);
    assert_eq!(result.evidence.len(), 1);
    assert_eq!(h.verifier.calls(), 1);
}

#[test]
fn test_claim_outcome_serializes_with_state_tag() {
    let json = serde_json::to_value(ClaimOutcome::InsufficientEvidence).unwrap();
    assert_eq!(json["state"], "insufficient_evidence");
}
