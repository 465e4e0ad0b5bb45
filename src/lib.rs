//! Claimflow library crate (used by the server binary and integration tests).
//!
//! Verifies the factual claims spoken in a short video: transcript (or audio) in, one
//! [`VideoReport`] out, with every external call recorded in the processing log.
//!
//! # Public API Surface
//!
//! ## Orchestration
//! - [`VideoOrchestrator`], [`Capabilities`] - Per-video fan-out over claims
//! - [`ClaimPipeline`], [`ClaimState`], [`transition`] - Per-claim state machine
//! - [`Aggregator`], [`VideoReport`] - Final report and persistence
//!
//! ## External Calls
//! - [`RateLimitedClient`], [`ClientSet`], [`ClientConfig`] - Concurrency ceiling, retry, timeout
//! - Provider traits and adapters in [`provider`]
//! - [`CancelToken`] - Hierarchical cancellation for deadlines and aborts
//!
//! ## Persistence & Metrics
//! - [`Store`], [`SqliteStore`], [`MemoryStore`]
//! - [`LogRecorder`], [`MetricsSink`], [`ProcessingLogEntry`]
//!
//! ## Offline Evaluation
//! - [`evaluation`]: classification metrics and transcript error rates
//!
//! ## Test/Mock Support
//! Mock providers and sinks are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cancel;
pub mod client;
pub mod config;
pub mod constants;
pub mod evaluation;
pub mod gateway;
pub mod hashing;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod provider;
pub mod ranking;
pub mod report;
pub mod storage;

pub use cancel::{CancelReason, CancelToken};
pub use client::{Capability, ClientConfig, ClientError, ClientSet, ClientsConfig, RateLimitedClient};
pub use config::{Config, ConfigError, PipelineConfig};
pub use evaluation::{EvaluationError, EvaluationMetrics, EvaluationRecord};
pub use gateway::{AppState, GatewayError, create_router};
pub use hashing::{audio_video_id, claim_fingerprint, hash_to_u64, normalize_claim_text};
#[cfg(any(test, feature = "mock"))]
pub use metrics::MemorySink;
pub use metrics::{
    CallContext, InfluxConfig, InfluxLineSink, LogRecorder, LogStatus, MetricsError,
    MetricsSink, ProcessingLogEntry, RunLog, TracingSink,
};
pub use model::{Claim, ClaimType, Evidence, VerdictLabel, Verification, Video, VideoStatus};
pub use orchestrator::{Capabilities, VideoOrchestrator};
pub use pipeline::{
    ClaimFailure, ClaimOutcome, ClaimPipeline, ClaimResult, ClaimState, FailureStage, Stage,
    StageEvent, transition,
};
#[cfg(any(test, feature = "mock"))]
pub use provider::{MockDecomposer, MockSearch, MockSpeech, MockVerifier};
pub use provider::{
    ClaimDecomposer, ExtractedClaim, GenaiClaimService, GoogleSearchClient,
    KeywordBaselineVerifier, ProviderError, SearchHit, SearchProvider, SpeechToText,
    Transcription, Verifier, VerifierResponse, WhisperClient,
};
pub use ranking::{EvidenceRanker, HeuristicScorer, RankerConfig, RelevanceScorer};
pub use report::{Aggregator, ReportSummary, RunScope, VideoReport, aggregate};
pub use storage::{MemoryStore, SqliteStore, StorageError, Store, StoredVideo};
