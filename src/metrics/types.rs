use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    /// The attempt failed and another one follows.
    Retry,
    Failure,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Retry => "retry",
            Self::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "retry" => Some(Self::Retry),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Entries produced by one video run, kept apart from the shared buffer so nothing is
/// evicted before the run is persisted.
#[derive(Clone, Default)]
pub struct RunLog {
    entries: Arc<Mutex<Vec<ProcessingLogEntry>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: ProcessingLogEntry) {
        self.entries.lock().push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entries in emission order.
    pub fn entries(&self) -> Vec<ProcessingLogEntry> {
        self.entries.lock().clone()
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog").field("entries", &self.len()).finish()
    }
}

impl PartialEq for RunLog {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

impl Eq for RunLog {}

/// Who a call is made on behalf of, and which run collects its log entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub video_id: Option<String>,
    pub claim_id: Option<String>,
    pub run: Option<RunLog>,
}

impl CallContext {
    pub fn video(video_id: &str) -> Self {
        Self {
            video_id: Some(video_id.to_string()),
            claim_id: None,
            run: None,
        }
    }

    pub fn claim(video_id: &str, claim_id: &str) -> Self {
        Self {
            video_id: Some(video_id.to_string()),
            claim_id: Some(claim_id.to_string()),
            run: None,
        }
    }

    pub fn in_run(mut self, run: &RunLog) -> Self {
        self.run = Some(run.clone());
        self
    }
}

/// One record per external call attempt, plus one summary per video. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingLogEntry {
    pub video_id: Option<String>,
    pub claim_id: Option<String>,
    pub component: String,
    pub status: LogStatus,
    pub message: String,
    pub latency_ms: u64,
    /// 1-based attempt number; 0 for entries not tied to a call.
    pub attempt: u32,
    pub recorded_at: DateTime<Utc>,
}

impl ProcessingLogEntry {
    pub fn new(
        ctx: &CallContext,
        component: &str,
        status: LogStatus,
        message: impl Into<String>,
        latency_ms: u64,
        attempt: u32,
    ) -> Self {
        Self {
            video_id: ctx.video_id.clone(),
            claim_id: ctx.claim_id.clone(),
            component: component.to_string(),
            status,
            message: message.into(),
            latency_ms,
            attempt,
            recorded_at: Utc::now(),
        }
    }
}
