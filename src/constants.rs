//! Cross-cutting, shared constants.
//!
//! Component names are persisted with every processing log entry, so treat them as part of
//! the storage contract.

/// Component name for speech-to-text calls.
pub const COMPONENT_SPEECH_TO_TEXT: &str = "speech_to_text";
/// Component name for claim decomposition calls.
pub const COMPONENT_DECOMPOSITION: &str = "claim_decomposition";
/// Component name for evidence search calls.
pub const COMPONENT_RETRIEVAL: &str = "evidence_retrieval";
/// Component name for verification calls.
pub const COMPONENT_VERIFICATION: &str = "verification";
/// Component name of the per-video summary entry.
pub const COMPONENT_AGGREGATOR: &str = "aggregator";

pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MIN_RELEVANCE: f32 = 0.3;
pub const DEFAULT_QUERIES_PER_CLAIM: usize = 1;
pub const DEFAULT_SEARCH_RESULTS: usize = 5;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_DELAY_MS: u64 = 8_000;
pub const DEFAULT_JITTER_MS: u64 = 250;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Malformed responses are retried at most this many times, within `max_attempts`.
pub const MALFORMED_RETRY_LIMIT: u32 = 1;

/// Oldest processing log entries are evicted from memory past this many.
pub const DEFAULT_LOG_RETENTION: usize = 50_000;

/// Entries waiting for the metrics sinks; further entries are dropped until the queue drains.
pub const DEFAULT_SINK_QUEUE_CAPACITY: usize = 4_096;

/// Header carrying the video processing status on gateway responses.
pub const CLAIMFLOW_STATUS_HEADER: &str = "X-Claimflow-Status";
pub const CLAIMFLOW_STATUS_COMPLETED: &str = "completed";
pub const CLAIMFLOW_STATUS_FAILED: &str = "failed";
pub const CLAIMFLOW_STATUS_HEALTHY: &str = "healthy";
pub const CLAIMFLOW_STATUS_READY: &str = "ready";
pub const CLAIMFLOW_STATUS_NOT_READY: &str = "not_ready";
pub const CLAIMFLOW_STATUS_ERROR: &str = "error";

/// Largest audio upload the gateway accepts.
pub const DEFAULT_MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;
