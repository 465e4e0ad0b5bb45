use crate::constants::{DEFAULT_MIN_RELEVANCE, DEFAULT_TOP_K};

/// Blend weights of [`HeuristicScorer`](super::HeuristicScorer). Should sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub domain_authority: f32,
    pub keyword_overlap: f32,
    pub recency: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            domain_authority: 0.4,
            keyword_overlap: 0.4,
            recency: 0.2,
        }
    }
}

impl RankingWeights {
    pub fn validate(&self) -> Result<(), String> {
        let parts = [self.domain_authority, self.keyword_overlap, self.recency];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("ranking weights must be finite and non-negative".to_string());
        }
        let sum: f32 = parts.iter().sum();
        if (sum - 1.0).abs() > 1e-3 {
            return Err(format!("ranking weights must sum to 1.0, got {sum}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankerConfig {
    /// Maximum evidence items kept per claim.
    pub top_k: usize,
    /// Hits scoring below this are dropped before truncation.
    pub min_score: f32,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_RELEVANCE,
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(format!("min_score must be in [0, 1], got {}", self.min_score));
        }
        Ok(())
    }
}
