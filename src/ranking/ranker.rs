use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::model::{Claim, Evidence};
use crate::provider::SearchHit;

use super::config::RankerConfig;
use super::scorer::{HeuristicScorer, RelevanceScorer};

/// Turns a claim's merged search hits into its ranked evidence list.
#[derive(Clone)]
pub struct EvidenceRanker {
    scorer: Arc<dyn RelevanceScorer>,
    config: RankerConfig,
}

impl std::fmt::Debug for EvidenceRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceRanker")
            .field("config", &self.config)
            .finish()
    }
}

impl EvidenceRanker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, config: RankerConfig) -> Self {
        Self { scorer, config }
    }

    pub fn heuristic(config: RankerConfig) -> Self {
        Self::new(Arc::new(HeuristicScorer::default()), config)
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Scores, filters by `min_score`, sorts descending and keeps `top_k`.
    ///
    /// The sort is stable, so equal scores keep retrieval order.
    pub fn rank(&self, claim: &Claim, hits: &[SearchHit]) -> Vec<Evidence> {
        let mut scored: Vec<(usize, &SearchHit, f32)> = hits
            .iter()
            .enumerate()
            .map(|(position, hit)| (position, hit, self.scorer.score(&claim.text, hit)))
            .filter(|(_, _, score)| *score >= self.config.min_score)
            .collect();

        scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
        scored.truncate(self.config.top_k);

        debug!(
            claim_id = %claim.id,
            hits = hits.len(),
            kept = scored.len(),
            top_score = scored.first().map(|s| s.2),
            "Ranked evidence"
        );

        scored
            .into_iter()
            .enumerate()
            .map(|(rank, (position, hit, score))| Evidence {
                id: Evidence::make_id(&claim.id, position, &hit.url),
                claim_id: claim.id.clone(),
                title: hit.title.clone(),
                url: hit.url.clone(),
                snippet: hit.snippet.clone(),
                relevance_score: score,
                retrieval_position: position,
                rank,
            })
            .collect()
    }
}
