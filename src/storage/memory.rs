use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::metrics::ProcessingLogEntry;
use crate::model::{Claim, Evidence, Verification, Video, VideoStatus};

use super::error::StorageError;
use super::types::StoredVideo;
use super::{Store, check_claim_set};

#[derive(Default)]
struct Tables {
    videos: HashMap<String, StoredVideo>,
    claims: HashMap<String, Claim>,
    evidence: HashMap<String, Evidence>,
    verifications: Vec<Verification>,
    log: Vec<ProcessingLogEntry>,
}

/// In-process store with the same integrity rules as [`SqliteStore`](super::SqliteStore).
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("MemoryStore")
            .field("videos", &tables.videos.len())
            .field("claims", &tables.claims.len())
            .field("evidence", &tables.evidence.len())
            .field("verifications", &tables.verifications.len())
            .field("log", &tables.log.len())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video_count(&self) -> usize {
        self.tables.read().videos.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn write_video(&self, video: &Video, status: &VideoStatus) -> Result<(), StorageError> {
        self.tables.write().videos.insert(
            video.id.clone(),
            StoredVideo {
                video: video.clone(),
                status: status.clone(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn replace_claims(
        &self,
        video_id: &str,
        claims: &[Claim],
        evidence: &[Evidence],
    ) -> Result<(), StorageError> {
        check_claim_set(video_id, claims, evidence)?;

        let mut tables = self.tables.write();
        if !tables.videos.contains_key(video_id) {
            return Err(StorageError::Integrity(format!(
                "claims reference unknown video {video_id}"
            )));
        }

        let kept: HashSet<&str> = claims.iter().map(|c| c.id.as_str()).collect();
        let previous: HashSet<String> = tables
            .claims
            .values()
            .filter(|c| c.video_id == video_id)
            .map(|c| c.id.clone())
            .collect();

        tables.evidence.retain(|_, e| !previous.contains(&e.claim_id));
        tables
            .verifications
            .retain(|v| !previous.contains(&v.claim_id) || kept.contains(v.claim_id.as_str()));
        tables.claims.retain(|_, c| c.video_id != video_id);

        for claim in claims {
            tables.claims.insert(claim.id.clone(), claim.clone());
        }
        for item in evidence {
            tables.evidence.insert(item.id.clone(), item.clone());
        }
        Ok(())
    }

    async fn write_verifications(
        &self,
        verifications: &[Verification],
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        if let Some(orphan) = verifications
            .iter()
            .find(|v| !tables.claims.contains_key(&v.claim_id))
        {
            return Err(StorageError::Integrity(format!(
                "verification {} references unknown claim {}",
                orphan.id, orphan.claim_id
            )));
        }
        tables.verifications.extend_from_slice(verifications);
        Ok(())
    }

    async fn append_log_entries(
        &self,
        entries: &[ProcessingLogEntry],
    ) -> Result<(), StorageError> {
        self.tables.write().log.extend_from_slice(entries);
        Ok(())
    }

    async fn video(&self, video_id: &str) -> Result<Option<StoredVideo>, StorageError> {
        Ok(self.tables.read().videos.get(video_id).cloned())
    }

    async fn claims_by_video(&self, video_id: &str) -> Result<Vec<Claim>, StorageError> {
        let mut claims: Vec<Claim> = self
            .tables
            .read()
            .claims
            .values()
            .filter(|c| c.video_id == video_id)
            .cloned()
            .collect();
        claims.sort_by_key(|c| c.position);
        Ok(claims)
    }

    async fn evidence_by_claim(&self, claim_id: &str) -> Result<Vec<Evidence>, StorageError> {
        let mut evidence: Vec<Evidence> = self
            .tables
            .read()
            .evidence
            .values()
            .filter(|e| e.claim_id == claim_id)
            .cloned()
            .collect();
        evidence.sort_by_key(|e| e.rank);
        Ok(evidence)
    }

    async fn verifications_by_claim(
        &self,
        claim_id: &str,
    ) -> Result<Vec<Verification>, StorageError> {
        Ok(self
            .tables
            .read()
            .verifications
            .iter()
            .filter(|v| v.claim_id == claim_id)
            .cloned()
            .collect())
    }

    async fn log_entries_by_video(
        &self,
        video_id: &str,
    ) -> Result<Vec<ProcessingLogEntry>, StorageError> {
        Ok(self
            .tables
            .read()
            .log
            .iter()
            .filter(|e| e.video_id.as_deref() == Some(video_id))
            .cloned()
            .collect())
    }
}
