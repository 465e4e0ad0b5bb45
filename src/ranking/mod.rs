//! Local evidence ranking.
//!
//! Scores are computed without external calls, so ranking never suspends and never fails.

pub mod config;
pub mod ranker;
pub mod scorer;
pub mod text;

#[cfg(test)]
mod tests;

pub use config::{RankerConfig, RankingWeights};
pub use ranker::EvidenceRanker;
pub use scorer::{HeuristicScorer, RelevanceScorer};
