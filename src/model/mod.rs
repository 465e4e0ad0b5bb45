//! Entities that flow through the pipeline and into storage.
//!
//! Everything here is plain data. Identifiers are deterministic where the pipeline can make
//! them so (claims and evidence), which keeps re-runs of the same video idempotent in the store.
//! Verifications get fresh identifiers because history is append-only.

pub mod types;


pub use types::{Claim, ClaimType, Evidence, VerdictLabel, Verification, Video, VideoStatus};
