use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{info, instrument, warn};

use crate::cancel::{CancelReason, CancelToken};
use crate::client::ClientSet;
use crate::config::{ConfigError, PipelineConfig};
use crate::metrics::LogRecorder;
use crate::model::{Video, VideoStatus};
use crate::pipeline::{ClaimPipeline, ClaimResult};
use crate::provider::{ClaimDecomposer, SearchProvider, SpeechToText, Verifier};
use crate::ranking::{EvidenceRanker, RelevanceScorer};
use crate::report::{Aggregator, RunScope, VideoReport, aggregate};
use crate::storage::Store;

use super::claims::build_claims;

pub const STAGE_TRANSCRIPTION: &str = "transcription";
pub const STAGE_DECOMPOSITION: &str = "decomposition";

/// The collaborators one deployment talks to.
#[derive(Clone)]
pub struct Capabilities {
    /// `None` disables audio input.
    pub speech: Option<Arc<dyn SpeechToText>>,
    pub decomposer: Arc<dyn ClaimDecomposer>,
    pub search: Arc<dyn SearchProvider>,
    pub verifier: Arc<dyn Verifier>,
}

/// Runs `fut`, cancelling `token` with `reason` once `deadline` elapses.
///
/// The future keeps running after the cancel so it can reach its terminal state.
async fn with_deadline<F: Future>(
    token: &CancelToken,
    deadline: Option<Duration>,
    reason: CancelReason,
    fut: F,
) -> F::Output {
    let Some(limit) = deadline else {
        return fut.await;
    };

    tokio::pin!(fut);
    tokio::select! {
        out = &mut fut => return out,
        _ = tokio::time::sleep(limit) => {
            if token.cancel(reason) {
                warn!(reason = %reason, deadline_ms = limit.as_millis() as u64, "Deadline elapsed");
            }
        }
    }
    fut.await
}

/// Turns one video into a [`VideoReport`].
///
/// Decomposes once, fans claims out under a bounded worker pool, waits for every claim to
/// reach a terminal state and hands the results to the [`Aggregator`].
pub struct VideoOrchestrator {
    speech: Option<Arc<dyn SpeechToText>>,
    decomposer: Arc<dyn ClaimDecomposer>,
    clients: ClientSet,
    pipeline: ClaimPipeline,
    aggregator: Aggregator,
    config: PipelineConfig,
}

impl std::fmt::Debug for VideoOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoOrchestrator")
            .field("audio_enabled", &self.speech.is_some())
            .field("clients", &self.clients)
            .field("pipeline", &self.pipeline)
            .field("config", &self.config)
            .finish()
    }
}

impl VideoOrchestrator {
    /// Fails if the pipeline config is invalid for the clients' policies.
    pub fn new(
        capabilities: Capabilities,
        clients: ClientSet,
        store: Arc<dyn Store>,
        config: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate(&clients.config())?;

        let pipeline = ClaimPipeline::new(
            capabilities.search,
            capabilities.verifier,
            clients.search.clone(),
            clients.verification.clone(),
            EvidenceRanker::heuristic(config.ranker()),
            config.queries_per_claim,
        );
        let aggregator = Aggregator::new(store, clients.recorder().clone());

        Ok(Self {
            speech: capabilities.speech,
            decomposer: capabilities.decomposer,
            clients,
            pipeline,
            aggregator,
            config,
        })
    }

    /// Replaces the heuristic relevance scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        let ranker = EvidenceRanker::new(scorer, self.config.ranker());
        self.pipeline = self.pipeline.with_ranker(ranker);
        self
    }

    pub fn clients(&self) -> &ClientSet {
        &self.clients
    }

    pub fn recorder(&self) -> &Arc<LogRecorder> {
        self.clients.recorder()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.aggregator.store()
    }

    pub fn speech(&self) -> Option<&Arc<dyn SpeechToText>> {
        self.speech.as_ref()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[instrument(skip(self, video, cancel), fields(video_id = %video.id))]
    pub async fn process_transcript(&self, video: Video, cancel: &CancelToken) -> VideoReport {
        self.process(video, cancel, RunScope::start()).await
    }

    /// Transcribes `audio`, then processes the transcript like [`Self::process_transcript`].
    ///
    /// A transcription failure fails the video with zero claims.
    #[instrument(skip(self, audio, cancel), fields(audio_bytes = audio.len()))]
    pub async fn process_audio(
        &self,
        video_id: &str,
        audio: &[u8],
        cancel: &CancelToken,
    ) -> VideoReport {
        let run = RunScope::start();

        let Some(speech) = self.speech.as_ref() else {
            let status = VideoStatus::failed(
                STAGE_TRANSCRIPTION,
                "unavailable",
                "no speech-to-text service configured",
            );
            return self.fail_early(Video::new(video_id, ""), status, run).await;
        };

        let transcription = self
            .clients
            .speech
            .invoke(&run.video_context(video_id), cancel, || {
                speech.transcribe(audio)
            })
            .await;

        match transcription {
            Ok(t) => {
                let mut video = Video::new(video_id, t.text);
                video.language = t.language;
                video.duration_secs = t.duration_secs;
                self.process(video, cancel, run).await
            }
            Err(e) => {
                warn!(video_id, error = %e, "Transcription failed");
                let status = VideoStatus::failed(STAGE_TRANSCRIPTION, e.reason_code(), e.to_string());
                self.fail_early(Video::new(video_id, ""), status, run).await
            }
        }
    }

    async fn process(&self, video: Video, cancel: &CancelToken, run: RunScope) -> VideoReport {
        let run_token = cancel.child();
        let (status, results) = with_deadline(
            &run_token,
            self.config.video_deadline,
            CancelReason::VideoDeadline,
            self.run_transcript(&video, &run, &run_token),
        )
        .await;

        let report = aggregate(video, status, results);
        self.aggregator.finalize(report, run).await
    }

    async fn fail_early(&self, video: Video, status: VideoStatus, run: RunScope) -> VideoReport {
        let report = aggregate(video, status, Vec::new());
        self.aggregator.finalize(report, run).await
    }

    async fn run_transcript(
        &self,
        video: &Video,
        run: &RunScope,
        token: &CancelToken,
    ) -> (VideoStatus, Vec<ClaimResult>) {
        let decomposer = &self.decomposer;
        let transcript = video.transcript.as_str();

        let extracted = match self
            .clients
            .decomposition
            .invoke(&run.video_context(&video.id), token, || {
                decomposer.decompose(transcript)
            })
            .await
        {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(video_id = %video.id, error = %e, "Decomposition failed");
                return (
                    VideoStatus::failed(STAGE_DECOMPOSITION, e.reason_code(), e.to_string()),
                    Vec::new(),
                );
            }
        };

        let claims = build_claims(&video.id, extracted);
        info!(
            video_id = %video.id,
            claims = claims.len(),
            duplicates = claims.iter().filter(|c| c.duplicate_of.is_some()).count(),
            workers = self.config.worker_pool_size,
            "Fanning out claims"
        );

        let results = stream::iter(claims.into_iter().map(|claim| {
            let claim_token = token.child();
            async move {
                with_deadline(
                    &claim_token,
                    self.config.claim_deadline,
                    CancelReason::ClaimDeadline,
                    self.pipeline.run(&claim, run.log(), &claim_token),
                )
                .await
            }
        }))
        .buffer_unordered(self.config.worker_pool_size)
        .collect::<Vec<_>>()
        .await;

        (VideoStatus::Completed, results)
    }
}
