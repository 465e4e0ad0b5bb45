//! End-to-end scenarios for one video through decomposition, fan-out and aggregation.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::fixtures::{
    HarnessBuilder, Route, RoutedSearch, VIDEO_ID, hit, pipeline_config, policy,
};

use claimflow::cancel::{CancelReason, CancelToken};
use claimflow::client::{ClientConfig, ClientsConfig};
use claimflow::config::PipelineConfig;
use claimflow::constants::{COMPONENT_AGGREGATOR, COMPONENT_RETRIEVAL};
use claimflow::metrics::{LogStatus, MemorySink};
use claimflow::model::{Claim, VerdictLabel, Video, VideoStatus};
use claimflow::pipeline::{ClaimOutcome, FailureStage};
use claimflow::provider::{
    ExtractedClaim, MockDecomposer, MockSearch, MockVerifier, ProviderError, VerifierResponse,
};
use claimflow::report::aggregate;

const CLAIM_A: &str = "The Eiffel Tower is about 330 metres tall";
const CLAIM_B: &str = "Atlantis was discovered off the coast in 2019";
const CLAIM_C: &str = "The Moon landing was broadcast live in 1969";

fn video(transcript: &str) -> Video {
    Video::new(VIDEO_ID, transcript)
}

fn patient_policy() -> ClientsConfig {
    ClientsConfig::uniform(ClientConfig {
        call_timeout: Duration::from_secs(60),
        ..policy(4)
    })
}

#[tokio::test(start_paused = true)]
async fn test_three_claim_scenario() {
    let search = RoutedSearch::new()
        .route("eiffel", Route::Hits(vec![hit(1, "Eiffel"), hit(2, "Eiffel")]))
        .route("atlantis", Route::Hits(Vec::new()))
        .route("moon", Route::Hang);

    let harness = HarnessBuilder::new(&[CLAIM_A, CLAIM_B, CLAIM_C])
        .search(search)
        .build();

    let report = harness
        .orchestrator
        .process_transcript(video("a video about three things"), &CancelToken::new())
        .await;

    assert!(report.status.is_completed());
    assert_eq!(report.summary.total_claims, 3);
    assert_eq!(report.summary.verified, 1);
    assert_eq!(report.summary.insufficient_evidence, 1);
    assert_eq!(report.summary.failed, 1);

    let a = &report.claims[0];
    assert_eq!(a.claim.text, CLAIM_A);
    assert_eq!(a.evidence.len(), 2);
    let verification = a.verification().expect("claim A verified");
    assert_eq!(verification.label, VerdictLabel::Supported);
    assert!((verification.confidence - 0.9).abs() < f32::EPSILON);

    assert_eq!(report.claims[1].outcome, ClaimOutcome::InsufficientEvidence);

    let c = &report.claims[2];
    let failure = c.failure().expect("claim C failed");
    assert_eq!(failure.stage, FailureStage::Retrieval);
    assert_eq!(failure.reason, "timeout");

    let c_retrieval: Vec<_> = harness
        .recorder
        .entries_for_claim(&c.claim.id)
        .into_iter()
        .filter(|e| e.component == COMPONENT_RETRIEVAL)
        .collect();
    assert_eq!(c_retrieval.len(), 4);
    assert_eq!(
        c_retrieval.iter().map(|e| e.status).collect::<Vec<_>>(),
        vec![
            LogStatus::Retry,
            LogStatus::Retry,
            LogStatus::Retry,
            LogStatus::Failure
        ]
    );

    for ok_claim in [&report.claims[0], &report.claims[1]] {
        let entries = harness.recorder.entries_for_claim(&ok_claim.claim.id);
        assert!(entries.iter().all(|e| e.status == LogStatus::Success));
    }

    let summaries = harness
        .recorder
        .entries_for_video(VIDEO_ID)
        .into_iter()
        .filter(|e| e.component == COMPONENT_AGGREGATOR)
        .count();
    assert_eq!(summaries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_is_persisted() {
    let search = RoutedSearch::new()
        .route("eiffel", Route::Hits(vec![hit(1, "Eiffel"), hit(2, "Eiffel")]))
        .route("moon", Route::Hang);
    let harness = HarnessBuilder::new(&[CLAIM_A, CLAIM_B, CLAIM_C])
        .search(search)
        .build();

    let report = harness
        .orchestrator
        .process_transcript(video("transcript"), &CancelToken::new())
        .await;

    let stored = harness.store.video(VIDEO_ID).await.unwrap().unwrap();
    assert_eq!(stored.status, VideoStatus::Completed);

    let claims = harness.store.claims_by_video(VIDEO_ID).await.unwrap();
    assert_eq!(claims.len(), 3);

    let a_id = &report.claims[0].claim.id;
    assert_eq!(harness.store.evidence_by_claim(a_id).await.unwrap().len(), 2);
    assert_eq!(
        harness.store.verifications_by_claim(a_id).await.unwrap().len(),
        1
    );

    let logged = harness.store.log_entries_by_video(VIDEO_ID).await.unwrap();
    assert_eq!(logged.len(), harness.recorder.entries_for_video(VIDEO_ID).len());
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_then_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let search = MockSearch::new(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(ProviderError::transient("upstream 503"))
        } else {
            Ok(vec![hit(1, "Eiffel")])
        }
    });

    let harness = HarnessBuilder::new(&[CLAIM_A]).search(search).build();
    let report = harness
        .orchestrator
        .process_transcript(video("transcript"), &CancelToken::new())
        .await;

    assert_eq!(report.summary.verified, 1);
    let entries: Vec<_> = harness
        .recorder
        .entries_for_claim(&report.claims[0].claim.id)
        .into_iter()
        .filter(|e| e.component == COMPONENT_RETRIEVAL)
        .collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].status, LogStatus::Success);
    assert_eq!(entries[2].attempt, 3);
}

#[tokio::test(start_paused = true)]
async fn test_aggregation_is_idempotent() {
    let search = RoutedSearch::new()
        .route("eiffel", Route::Hits(vec![hit(1, "Eiffel")]))
        .route("moon", Route::Hits(vec![hit(1, "Moon")]));
    let harness = HarnessBuilder::new(&[CLAIM_A, CLAIM_B, CLAIM_C])
        .search(search)
        .build();

    let report = harness
        .orchestrator
        .process_transcript(video("transcript"), &CancelToken::new())
        .await;

    let mut shuffled = report.claims.clone();
    shuffled.reverse();

    let again = aggregate(report.video.clone(), report.status.clone(), shuffled);
    assert_eq!(again, report);

    let twice = aggregate(again.video.clone(), again.status.clone(), again.claims.clone());
    assert_eq!(twice.summary, report.summary);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_with_claims_in_flight() {
    let texts = [
        "Claim number one about rivers",
        "Claim number two about mountains",
        "Claim number three about deserts",
        "Claim number four about oceans",
        "Claim number five about forests",
    ];
    let search = RoutedSearch::new().route("claim", Route::Hits(vec![hit(1, "Geo")]));
    let verifier = Arc::new(
        MockVerifier::answering(VerdictLabel::Supported, 0.8).with_delay(Duration::from_secs(30)),
    );

    let harness = HarnessBuilder::new(&texts)
        .search(search)
        .shared_verifier(verifier.clone())
        .clients(patient_policy())
        .build();

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel(CancelReason::Aborted);
    });

    let report = harness
        .orchestrator
        .process_transcript(video("transcript"), &cancel)
        .await;

    assert_eq!(report.summary.total_claims, 5);
    assert_eq!(report.summary.verified, 0);
    for result in &report.claims {
        let failure = result.failure().expect("every claim stopped");
        assert_eq!(failure.stage, FailureStage::Cancelled);
        assert_eq!(failure.reason, "aborted");
    }
    assert!(verifier.calls() <= 4);
}

#[tokio::test(start_paused = true)]
async fn test_claim_deadline_fails_slow_claims() {
    let search = RoutedSearch::new()
        .route("eiffel", Route::Hits(vec![hit(1, "Eiffel")]))
        .route("moon", Route::Hits(vec![hit(1, "Moon")]));
    let verifier =
        MockVerifier::answering(VerdictLabel::Refuted, 0.7).with_delay(Duration::from_secs(20));

    let mut config = common::fixtures::pipeline_config();
    config.claim_deadline = Some(Duration::from_secs(3));

    let harness = HarnessBuilder::new(&[CLAIM_A, CLAIM_C])
        .search(search)
        .verifier(verifier)
        .clients(patient_policy())
        .config(config)
        .build();

    let report = harness
        .orchestrator
        .process_transcript(video("transcript"), &CancelToken::new())
        .await;

    assert!(report.status.is_completed());
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.summary.failures_by_stage.get("timeout"), Some(&2));
    for result in &report.claims {
        let failure = result.failure().unwrap();
        assert_eq!(failure.reason, "claim_deadline");
        assert_eq!(result.evidence.len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_citations_stay_within_ranked_evidence() {
    let search = RoutedSearch::new()
        .route("eiffel", Route::Hits(vec![hit(1, "Eiffel"), hit(2, "Eiffel"), hit(3, "Eiffel")]))
        .route("moon", Route::Hits(vec![hit(1, "Moon")]));
    let verifier = MockVerifier::new(|_, evidence| {
        Ok(VerifierResponse {
            label: VerdictLabel::Supported,
            confidence: 0.75,
            explanation: "cites everything".to_string(),
            citations: (0..evidence.len()).rev().collect(),
        })
    });

    let harness = HarnessBuilder::new(&[CLAIM_A, CLAIM_C])
        .search(search)
        .verifier(verifier)
        .build();

    let report = harness
        .orchestrator
        .process_transcript(video("transcript"), &CancelToken::new())
        .await;

    assert_eq!(report.summary.verified, 2);
    for result in &report.claims {
        let verification = result.verification().unwrap();
        assert!(!verification.citations.is_empty());
        assert!(verification.citations.iter().all(|&i| i < result.evidence.len()));
        assert_eq!(
            verification.cited_evidence(&result.evidence).len(),
            verification.citations.len()
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_decomposition_failure_fails_video_with_zero_claims() {
    let harness = HarnessBuilder::new(&[])
        .decomposer(MockDecomposer::failing(ProviderError::permanent(
            "model not found",
        )))
        .build();

    let report = harness
        .orchestrator
        .process_transcript(video("transcript"), &CancelToken::new())
        .await;

    assert!(report.claims.is_empty());
    match &report.status {
        VideoStatus::Failed { stage, reason, .. } => {
            assert_eq!(stage, "decomposition");
            assert_eq!(reason, "permanent");
        }
        other => panic!("expected failed video, got {other:?}"),
    }

    let stored = harness.store.video(VIDEO_ID).await.unwrap().unwrap();
    assert!(!stored.status.is_completed());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_claims_are_flagged_and_verified() {
    let decomposer = MockDecomposer::returning(vec![
        ExtractedClaim::factual(CLAIM_A),
        ExtractedClaim::factual("the eiffel tower is about 330 metres tall!"),
    ]);
    let search = RoutedSearch::new().route("eiffel", Route::Hits(vec![hit(1, "Eiffel")]));

    let harness = HarnessBuilder::new(&[])
        .decomposer(decomposer)
        .search(search)
        .build();

    let report = harness
        .orchestrator
        .process_transcript(video("transcript"), &CancelToken::new())
        .await;

    assert_eq!(report.summary.total_claims, 2);
    assert_eq!(report.summary.duplicate_claims, 1);
    assert_eq!(report.summary.verified, 2);
    assert_eq!(
        report.claims[1].claim.duplicate_of.as_deref(),
        Some(Claim::make_id(VIDEO_ID, 0).as_str())
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_metrics_sink_leaves_claim_deadline_alone() {
    let sink = Arc::new(MemorySink::failing().with_delay(Duration::from_secs(2)));
    let harness = HarnessBuilder::new(&[CLAIM_A])
        .search(RoutedSearch::new().route("eiffel", Route::Hits(vec![hit(1, "Eiffel")])))
        .sink(sink)
        .config(PipelineConfig {
            queries_per_claim: 2,
            claim_deadline: Some(Duration::from_secs(3)),
            ..pipeline_config()
        })
        .build();

    let report = harness
        .orchestrator
        .process_transcript(video(CLAIM_A), &CancelToken::new())
        .await;

    assert_eq!(report.summary.verified, 1, "{:?}", report.claims[0].outcome);
    let retrievals = harness
        .recorder
        .entries()
        .iter()
        .filter(|e| e.component == COMPONENT_RETRIEVAL)
        .count();
    assert_eq!(retrievals, 2);
}
