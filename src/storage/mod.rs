//! Relational persistence for videos, claims, evidence, verifications and the processing log.
//!
//! Writes happen in dependency order (video, claims with their evidence, verifications, log).
//! Each run replaces its video's claims and evidence wholesale. Verifications and log entries
//! are append-only; a claim dropped by a re-run takes its verification history with it.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod types;


use async_trait::async_trait;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use sqlite::{SCHEMA_VERSION, SqliteStore};
pub use types::StoredVideo;

use std::collections::HashSet;

use crate::metrics::ProcessingLogEntry;
use crate::model::{Claim, Evidence, Verification, Video, VideoStatus};

/// Rejects a claim set whose claims or evidence point outside it.
fn check_claim_set(
    video_id: &str,
    claims: &[Claim],
    evidence: &[Evidence],
) -> Result<(), StorageError> {
    if let Some(stray) = claims.iter().find(|c| c.video_id != video_id) {
        return Err(StorageError::Integrity(format!(
            "claim {} belongs to video {}, not {video_id}",
            stray.id, stray.video_id
        )));
    }
    let ids: HashSet<&str> = claims.iter().map(|c| c.id.as_str()).collect();
    if let Some(orphan) = evidence.iter().find(|e| !ids.contains(e.claim_id.as_str())) {
        return Err(StorageError::Integrity(format!(
            "evidence {} references unknown claim {}",
            orphan.id, orphan.claim_id
        )));
    }
    Ok(())
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn write_video(&self, video: &Video, status: &VideoStatus) -> Result<(), StorageError>;

    /// Makes `claims` and `evidence` the video's complete claim set, atomically.
    ///
    /// The video must already be written, every claim must belong to it and every evidence
    /// item to one of `claims`. Earlier evidence of the video is removed; earlier claims not in
    /// `claims` are removed along with their verifications.
    async fn replace_claims(
        &self,
        video_id: &str,
        claims: &[Claim],
        evidence: &[Evidence],
    ) -> Result<(), StorageError>;

    async fn write_verifications(
        &self,
        verifications: &[Verification],
    ) -> Result<(), StorageError>;

    async fn append_log_entries(&self, entries: &[ProcessingLogEntry])
    -> Result<(), StorageError>;

    async fn video(&self, video_id: &str) -> Result<Option<StoredVideo>, StorageError>;

    /// Claims in decomposition order.
    async fn claims_by_video(&self, video_id: &str) -> Result<Vec<Claim>, StorageError>;

    /// Evidence in rank order.
    async fn evidence_by_claim(&self, claim_id: &str) -> Result<Vec<Evidence>, StorageError>;

    /// Verifications in write order, oldest first.
    async fn verifications_by_claim(
        &self,
        claim_id: &str,
    ) -> Result<Vec<Verification>, StorageError>;

    async fn log_entries_by_video(
        &self,
        video_id: &str,
    ) -> Result<Vec<ProcessingLogEntry>, StorageError>;
}
