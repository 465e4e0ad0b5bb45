use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::constants::COMPONENT_AGGREGATOR;
use crate::metrics::{CallContext, LogRecorder, LogStatus, ProcessingLogEntry, RunLog};
use crate::model::Evidence;
use crate::storage::{StorageError, Store};

use super::types::VideoReport;

/// One video run: its monotonic start and the log entries its calls produce.
#[derive(Debug, Clone)]
pub struct RunScope {
    started: Instant,
    log: RunLog,
}

impl RunScope {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            log: RunLog::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Context for a video-level call made during this run.
    pub fn video_context(&self, video_id: &str) -> CallContext {
        CallContext::video(video_id).in_run(&self.log)
    }
}

/// Emits the per-video summary entry and persists the report.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn Store>,
    recorder: Arc<LogRecorder>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    pub fn new(store: Arc<dyn Store>, recorder: Arc<LogRecorder>) -> Self {
        Self { store, recorder }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Emits exactly one `aggregator` entry, then persists the video, replaces its claims and
    /// evidence, appends verifications and the run's log entries.
    ///
    /// Persistence errors are logged and swallowed; the report is always returned.
    #[instrument(skip(self, report, run), fields(video_id = %report.video.id))]
    pub async fn finalize(&self, report: VideoReport, run: RunScope) -> VideoReport {
        let elapsed = run.elapsed();
        let status = if report.status.is_completed() {
            LogStatus::Success
        } else {
            LogStatus::Failure
        };

        let ctx = run.video_context(&report.video.id);
        self.recorder.emit(
            &ctx,
            ProcessingLogEntry::new(
                &ctx,
                COMPONENT_AGGREGATOR,
                status,
                report.digest(),
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                0,
            ),
        );

        if let Err(e) = self.persist(&report, run.log()).await {
            warn!(error = %e, "Failed to persist video report");
        }

        info!(
            status = report.status.as_str(),
            claims = report.summary.total_claims,
            verified = report.summary.verified,
            insufficient_evidence = report.summary.insufficient_evidence,
            failed = report.summary.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Video finalized"
        );

        report
    }

    async fn persist(&self, report: &VideoReport, log: &RunLog) -> Result<(), StorageError> {
        self.store.write_video(&report.video, &report.status).await?;

        let claims: Vec<_> = report.claims.iter().map(|r| r.claim.clone()).collect();
        let evidence: Vec<Evidence> = report
            .claims
            .iter()
            .flat_map(|r| r.evidence.iter().cloned())
            .collect();
        self.store
            .replace_claims(&report.video.id, &claims, &evidence)
            .await?;

        let verifications: Vec<_> = report
            .claims
            .iter()
            .filter_map(|r| r.verification().cloned())
            .collect();
        if !verifications.is_empty() {
            self.store.write_verifications(&verifications).await?;
        }

        self.store.append_log_entries(&log.entries()).await
    }
}
