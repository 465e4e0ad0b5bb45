use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::constants::DEFAULT_MAX_AUDIO_BYTES;
use crate::orchestrator::VideoOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<VideoOrchestrator>,

    /// Parent of every request's token. Cancelled on shutdown.
    pub shutdown: CancelToken,

    pub max_audio_bytes: usize,
}

impl AppState {
    pub fn new(orchestrator: Arc<VideoOrchestrator>) -> Self {
        Self {
            orchestrator,
            shutdown: CancelToken::new(),
            max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancelToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_max_audio_bytes(mut self, max: usize) -> Self {
        self.max_audio_bytes = max;
        self
    }
}
