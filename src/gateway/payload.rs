use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Claim, Evidence, Verification, Video, VideoStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTranscriptRequest {
    pub video_id: String,
    pub transcript: String,
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub language: Option<String>,
}

impl VerifyTranscriptRequest {
    pub fn into_video(self) -> Video {
        Video {
            id: self.video_id,
            transcript: self.transcript,
            duration_secs: self.duration_secs,
            language: self.language,
        }
    }
}

/// A persisted claim with its evidence and full verification history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredClaim {
    pub claim: Claim,
    pub evidence: Vec<Evidence>,
    /// Oldest first.
    pub verifications: Vec<Verification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoClaimsResponse {
    pub video: Video,
    pub status: VideoStatus,
    pub updated_at: DateTime<Utc>,
    pub claims: Vec<StoredClaim>,
}
