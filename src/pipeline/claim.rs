use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::cancel::CancelToken;
use crate::client::{ClientError, RateLimitedClient};
use crate::metrics::{CallContext, RunLog};
use crate::model::{Claim, Evidence, Verification};
use crate::provider::{SearchHit, SearchProvider, Verifier};
use crate::ranking::EvidenceRanker;

use super::query::build_queries;
use super::state::{ClaimState, StageEvent, transition};
use super::types::{ClaimOutcome, ClaimResult};

/// Drives one claim through retrieval, ranking and verification.
///
/// Failures stay inside the claim: `run` always returns a terminal [`ClaimResult`].
#[derive(Clone)]
pub struct ClaimPipeline {
    search: Arc<dyn SearchProvider>,
    verifier: Arc<dyn Verifier>,
    search_client: Arc<RateLimitedClient>,
    verify_client: Arc<RateLimitedClient>,
    ranker: EvidenceRanker,
    queries_per_claim: usize,
}

impl std::fmt::Debug for ClaimPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimPipeline")
            .field("ranker", &self.ranker)
            .field("queries_per_claim", &self.queries_per_claim)
            .finish()
    }
}

impl ClaimPipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        verifier: Arc<dyn Verifier>,
        search_client: Arc<RateLimitedClient>,
        verify_client: Arc<RateLimitedClient>,
        ranker: EvidenceRanker,
        queries_per_claim: usize,
    ) -> Self {
        Self {
            search,
            verifier,
            search_client,
            verify_client,
            ranker,
            queries_per_claim: queries_per_claim.max(1),
        }
    }

    /// Same pipeline with a different ranker.
    pub fn with_ranker(mut self, ranker: EvidenceRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn ranker(&self) -> &EvidenceRanker {
        &self.ranker
    }

    /// Every call attempt is also recorded in `log`.
    #[instrument(
        skip(self, claim, log, cancel),
        fields(claim_id = %claim.id, position = claim.position)
    )]
    pub async fn run(&self, claim: &Claim, log: &RunLog, cancel: &CancelToken) -> ClaimResult {
        let ctx = CallContext::claim(&claim.video_id, &claim.id).in_run(log);
        let mut state = ClaimState::Retrieving;

        loop {
            if !state.is_terminal() {
                if let Some(reason) = cancel.reason() {
                    state = transition(state, StageEvent::Interrupted(reason));
                    continue;
                }
            }

            let event = match state {
                ClaimState::Retrieving => match self.retrieve(claim, &ctx, cancel).await {
                    Ok(hits) => StageEvent::Retrieved(hits),
                    Err(err) => StageEvent::StageFailed(err),
                },
                ClaimState::Ranking { ref hits } => {
                    StageEvent::Ranked(self.ranker.rank(claim, hits))
                }
                ClaimState::Verifying { ref evidence } => {
                    match self.verify(claim, evidence, &ctx, cancel).await {
                        Ok(verification) => StageEvent::Verified(verification),
                        Err(err) => StageEvent::StageFailed(err),
                    }
                }
                ClaimState::Verified {
                    evidence,
                    verification,
                } => {
                    return finish(claim, evidence, ClaimOutcome::Verified { verification });
                }
                ClaimState::InsufficientEvidence => {
                    return finish(claim, Vec::new(), ClaimOutcome::InsufficientEvidence);
                }
                ClaimState::Failed { failure, evidence } => {
                    return finish(claim, evidence, ClaimOutcome::Failed { failure });
                }
            };

            state = transition(state, event);
        }
    }

    /// Runs each query through the search client and merges hits in retrieval order.
    ///
    /// Stops at the first query that fails for good.
    async fn retrieve(
        &self,
        claim: &Claim,
        ctx: &CallContext,
        cancel: &CancelToken,
    ) -> Result<Vec<SearchHit>, ClientError> {
        let mut merged = Vec::new();
        let mut seen_urls = HashSet::new();

        for query in build_queries(&claim.text, self.queries_per_claim) {
            let search = &self.search;
            let query = query.as_str();
            let hits = self
                .search_client
                .invoke(ctx, cancel, move || search.search(query))
                .await?;

            debug!(query_len = query.len(), hits = hits.len(), "Query returned");

            for hit in hits {
                if seen_urls.insert(hit.url.clone()) {
                    merged.push(hit);
                }
            }
        }

        Ok(merged)
    }

    /// Calls the verifier and validates its answer against the evidence that was sent.
    async fn verify(
        &self,
        claim: &Claim,
        evidence: &[Evidence],
        ctx: &CallContext,
        cancel: &CancelToken,
    ) -> Result<Verification, ClientError> {
        let verifier = &self.verifier;
        let claim_text = claim.text.as_str();

        let response = self
            .verify_client
            .invoke(ctx, cancel, move || async move {
                verifier
                    .verify(claim_text, evidence)
                    .await
                    .and_then(|response| response.validate(evidence.len()))
            })
            .await?;

        Ok(Verification::from_response(
            claim.id.clone(),
            response,
            evidence,
        ))
    }
}

fn finish(claim: &Claim, evidence: Vec<Evidence>, outcome: ClaimOutcome) -> ClaimResult {
    info!(
        outcome = outcome.kind(),
        evidence = evidence.len(),
        "Claim finished"
    );
    ClaimResult {
        claim: claim.clone(),
        evidence,
        outcome,
    }
}
