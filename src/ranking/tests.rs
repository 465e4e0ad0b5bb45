use std::collections::HashMap;
use std::sync::Arc;

use super::text::{keywords, mentioned_years, url_host};
use super::*;
use crate::hashing::claim_fingerprint;
use crate::model::{Claim, ClaimType};
use crate::provider::SearchHit;

struct FixedScorer(HashMap<String, f32>);

impl RelevanceScorer for FixedScorer {
    fn score(&self, _claim: &str, hit: &SearchHit) -> f32 {
        self.0.get(&hit.url).copied().unwrap_or(0.0)
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
        fingerprint: claim_fingerprint(text),
        duplicate_of: None,
    }
}

fn hit(url: &str) -> SearchHit {
    SearchHit::new(format!("title for {url}"), url, "snippet")
}

fn fixed_ranker(scores: &[(&str, f32)], config: RankerConfig) -> EvidenceRanker {
    let map = scores.iter().map(|(u, s)| (u.to_string(), *s)).collect();
    EvidenceRanker::new(Arc::new(FixedScorer(map)), config)
}

#[test]
fn test_rank_orders_descending_with_stable_ties() {
    let ranker = fixed_ranker(
        &[("a", 0.5), ("b", 0.9), ("c", 0.5), ("d", 0.7), ("e", 0.5)],
        RankerConfig {
            top_k: 10,
            min_score: 0.0,
        },
    );
    let hits: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|u| hit(u)).collect();

    let ranked = ranker.rank(&claim("anything"), &hits);
    let urls: Vec<_> = ranked.iter().map(|e| e.url.as_str()).collect();

    assert_eq!(urls, vec!["b", "d", "a", "c", "e"]);
    let ranks: Vec<_> = ranked.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    assert_eq!(ranked[2].retrieval_position, 0);
    assert_eq!(ranked[0].id, "v1:c000:e01");
}

#[test]
fn test_rank_filters_below_min_score_then_truncates() {
    let ranker = fixed_ranker(
        &[("a", 0.2), ("b", 0.8), ("c", 0.6), ("d", 0.31), ("e", 0.29)],
        RankerConfig {
            top_k: 2,
            min_score: 0.3,
        },
    );
    let hits: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|u| hit(u)).collect();

    let ranked = ranker.rank(&claim("anything"), &hits);
    let urls: Vec<_> = ranked.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, vec!["b", "c"]);
}

#[test]
fn test_rank_can_leave_nothing() {
    let ranker = fixed_ranker(
        &[("a", 0.1)],
        RankerConfig {
            top_k: 3,
            min_score: 0.5,
        },
    );
    assert!(ranker.rank(&claim("x"), &[hit("a")]).is_empty());
    assert!(ranker.rank(&claim("x"), &[]).is_empty());
}

#[test]
fn test_domain_authority_exact_partial_and_unknown() {
    let scorer = HeuristicScorer::default();
    assert_eq!(scorer.domain_score("https://wikipedia.org/wiki/Paris"), 0.95);
    assert_eq!(scorer.domain_score("https://www.reuters.com/world"), 0.90);

    let partial = scorer.domain_score("https://en.wikipedia.org/wiki/Paris");
    assert!((partial - 0.95 * 0.9).abs() < 1e-6);

    assert_eq!(scorer.domain_score("https://random-blog.net/post"), 0.5);
    assert_eq!(scorer.domain_score(""), 0.5);
}

#[test]
fn test_keyword_overlap() {
    let scorer = HeuristicScorer::default();
    let overlap = scorer.keyword_overlap(
        "The Eiffel Tower is located in Paris",
        "Paris landmark: the Eiffel tower",
    );
    // claim keywords: eiffel, tower, located, paris -> 3 shared
    assert!((overlap - 0.75).abs() < 1e-6);
    assert_eq!(scorer.keyword_overlap("is a", "anything"), 0.0);
}

#[test]
fn test_recency_relative_to_reference_year() {
    let scorer = HeuristicScorer::default().with_reference_year(2024);
    assert_eq!(scorer.recency_score("Updated in 2023"), 0.9);
    assert_eq!(scorer.recency_score("Built in 1889 and renovated 1998"), 0.6);
    assert_eq!(scorer.recency_score("No dates here"), 0.5);
    assert_eq!(scorer.recency_score("Planned for 2031"), 0.6);
}

#[test]
fn test_heuristic_score_blend() {
    let scorer = HeuristicScorer::default().with_reference_year(2024);
    let hit = SearchHit::new(
        "Eiffel Tower",
        "https://wikipedia.org/wiki/Eiffel_Tower",
        "The tower in Paris was repainted in 2022",
    );

    let score = scorer.score("The Eiffel Tower is in Paris", &hit);
    // 0.4 * 0.95 + 0.4 * 1.0 + 0.2 * 0.9
    assert!((score - 0.96).abs() < 1e-5, "score {score}");
}

#[test]
fn test_text_helpers() {
    assert_eq!(
        keywords("The population of Tokyo is about 14 million"),
        vec!["population", "tokyo", "million"]
    );
    assert_eq!(mentioned_years("from 1999 to 2024, not 12345 or 3000"), vec![1999, 2024]);
    assert_eq!(url_host("https://www.BBC.co.uk:443/news?id=1"), "bbc.co.uk");
    assert_eq!(url_host("reuters.com/article"), "reuters.com");
}

#[test]
fn test_weights_and_config_validation() {
    assert!(RankingWeights::default().validate().is_ok());
    assert!(
        RankingWeights {
            domain_authority: 0.5,
            keyword_overlap: 0.5,
            recency: 0.5,
        }
        .validate()
        .is_err()
    );
    assert!(RankerConfig::default().validate().is_ok());
    assert!(
        RankerConfig {
            top_k: 0,
            min_score: 0.1
        }
        .validate()
        .is_err()
    );
}
