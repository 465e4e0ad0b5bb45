//! Per-claim processing.
//!
//! A claim moves Retrieving → Ranking → Verifying → Verified, or ends early as
//! InsufficientEvidence or Failed. Every outcome is terminal and attributed to a stage.

pub mod claim;
pub mod query;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use claim::ClaimPipeline;
pub use query::build_queries;
pub use state::{ClaimFailure, ClaimState, FailureStage, Stage, StageEvent, transition};
pub use types::{ClaimOutcome, ClaimResult};
