//! Per-video orchestration.
//!
//! Cancellation is hierarchical: the caller's token is the parent of a per-run token that
//! carries the video deadline, which is the parent of one token per claim carrying the claim
//! deadline. In-flight calls finish when their token is cancelled; their results are dropped.

pub mod claims;
pub mod video;


pub use claims::build_claims;
pub use video::{Capabilities, STAGE_DECOMPOSITION, STAGE_TRANSCRIPTION, VideoOrchestrator};
