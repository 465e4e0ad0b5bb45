use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Video, VideoStatus};

/// A persisted video with its last written status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVideo {
    pub video: Video,
    pub status: VideoStatus,
    pub updated_at: DateTime<Utc>,
}
