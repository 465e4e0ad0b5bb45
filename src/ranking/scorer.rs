use chrono::Datelike;

use crate::provider::SearchHit;

use super::config::RankingWeights;
use super::text::{keyword_set, mentioned_years, url_host};

/// Local relevance score in [0, 1] for one hit against a claim.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, claim: &str, hit: &SearchHit) -> f32;
}

/// Source reputation table. Hosts are matched exactly, then by containment.
pub const DOMAIN_AUTHORITY: &[(&str, f32)] = &[
    ("wikipedia.org", 0.95),
    ("gov.uk", 0.95),
    ("census.gov", 0.95),
    ("who.int", 0.95),
    ("nasa.gov", 0.95),
    ("bbc.com", 0.90),
    ("bbc.co.uk", 0.90),
    ("reuters.com", 0.90),
    ("apnews.com", 0.90),
    ("nytimes.com", 0.90),
    ("nature.com", 0.90),
    ("theguardian.com", 0.85),
    ("snopes.com", 0.85),
    ("factcheck.org", 0.85),
    ("cnn.com", 0.80),
];

pub const UNKNOWN_DOMAIN_SCORE: f32 = 0.5;
/// Multiplier applied when a host only contains a known domain (e.g. `en.wikipedia.org`).
pub const PARTIAL_DOMAIN_FACTOR: f32 = 0.9;

pub const RECENT_YEAR_SCORE: f32 = 0.9;
pub const DATED_YEAR_SCORE: f32 = 0.6;
pub const UNDATED_SCORE: f32 = 0.5;
/// A mention this many years before the reference year, or later, counts as recent.
pub const RECENT_WINDOW_YEARS: i32 = 5;

/// Weighted blend of domain authority, keyword overlap and recency.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    weights: RankingWeights,
    reference_year: i32,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new(RankingWeights::default())
    }
}

impl HeuristicScorer {
    pub fn new(weights: RankingWeights) -> Self {
        Self {
            weights,
            reference_year: chrono::Utc::now().year(),
        }
    }

    /// Pins the year recency is measured against.
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }

    pub fn domain_score(&self, url: &str) -> f32 {
        let host = url_host(url);
        if host.is_empty() {
            return UNKNOWN_DOMAIN_SCORE;
        }

        if let Some((_, score)) = DOMAIN_AUTHORITY.iter().find(|(d, _)| *d == host) {
            return *score;
        }

        DOMAIN_AUTHORITY
            .iter()
            .find(|(d, _)| host.contains(d))
            .map(|(_, score)| score * PARTIAL_DOMAIN_FACTOR)
            .unwrap_or(UNKNOWN_DOMAIN_SCORE)
    }

    /// Share of the claim's keywords that appear in the hit text.
    pub fn keyword_overlap(&self, claim: &str, text: &str) -> f32 {
        let claim_words = keyword_set(claim);
        if claim_words.is_empty() {
            return 0.0;
        }
        let text_words = keyword_set(text);
        let shared = claim_words.intersection(&text_words).count();
        (shared as f32 / claim_words.len() as f32).min(1.0)
    }

    pub fn recency_score(&self, text: &str) -> f32 {
        let years = mentioned_years(text);
        if years.is_empty() {
            UNDATED_SCORE
        } else if years
            .iter()
            .any(|y| *y > self.reference_year - RECENT_WINDOW_YEARS && *y <= self.reference_year)
        {
            RECENT_YEAR_SCORE
        } else {
            DATED_YEAR_SCORE
        }
    }
}

impl RelevanceScorer for HeuristicScorer {
    fn score(&self, claim: &str, hit: &SearchHit) -> f32 {
        let text = format!("{} {}", hit.title, hit.snippet);
        let score = self.weights.domain_authority * self.domain_score(&hit.url)
            + self.weights.keyword_overlap * self.keyword_overlap(claim, &text)
            + self.weights.recency * self.recency_score(&text);

        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
