//! Rate-limited clients for external capabilities.
//!
//! One [`RateLimitedClient`] per capability, shared by every claim and video. It is the only
//! component that writes per-call processing log entries.

pub mod config;
pub mod error;
pub mod limiter;
pub mod types;


use std::sync::Arc;

pub use config::ClientConfig;
pub use error::ClientError;
pub use limiter::RateLimitedClient;
pub use types::Capability;

use crate::metrics::LogRecorder;

/// Per-capability client policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientsConfig {
    pub speech: ClientConfig,
    pub decomposition: ClientConfig,
    pub search: ClientConfig,
    pub verification: ClientConfig,
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            speech: ClientConfig::for_capability(Capability::SpeechToText),
            decomposition: ClientConfig::for_capability(Capability::Decomposition),
            search: ClientConfig::for_capability(Capability::Search),
            verification: ClientConfig::for_capability(Capability::Verification),
        }
    }
}

impl ClientsConfig {
    pub fn from_env() -> Self {
        Self {
            speech: ClientConfig::from_env(Capability::SpeechToText),
            decomposition: ClientConfig::from_env(Capability::Decomposition),
            search: ClientConfig::from_env(Capability::Search),
            verification: ClientConfig::from_env(Capability::Verification),
        }
    }

    /// Same policy for every capability.
    pub fn uniform(config: ClientConfig) -> Self {
        Self {
            speech: config.clone(),
            decomposition: config.clone(),
            search: config.clone(),
            verification: config,
        }
    }

    pub fn get(&self, capability: Capability) -> &ClientConfig {
        match capability {
            Capability::SpeechToText => &self.speech,
            Capability::Decomposition => &self.decomposition,
            Capability::Search => &self.search,
            Capability::Verification => &self.verification,
        }
    }
}

/// The four clients of one deployment, sharing a log recorder.
#[derive(Debug, Clone)]
pub struct ClientSet {
    pub speech: Arc<RateLimitedClient>,
    pub decomposition: Arc<RateLimitedClient>,
    pub search: Arc<RateLimitedClient>,
    pub verification: Arc<RateLimitedClient>,
    recorder: Arc<LogRecorder>,
}

impl ClientSet {
    pub fn new(config: &ClientsConfig, recorder: Arc<LogRecorder>) -> Self {
        let build = |capability: Capability| {
            Arc::new(RateLimitedClient::new(
                capability,
                config.get(capability).clone(),
                recorder.clone(),
            ))
        };

        Self {
            speech: build(Capability::SpeechToText),
            decomposition: build(Capability::Decomposition),
            search: build(Capability::Search),
            verification: build(Capability::Verification),
            recorder,
        }
    }

    /// The policies the clients were built with.
    pub fn config(&self) -> ClientsConfig {
        ClientsConfig {
            speech: self.speech.config().clone(),
            decomposition: self.decomposition.config().clone(),
            search: self.search.config().clone(),
            verification: self.verification.config().clone(),
        }
    }

    pub fn recorder(&self) -> &Arc<LogRecorder> {
        &self.recorder
    }

    pub fn get(&self, capability: Capability) -> &Arc<RateLimitedClient> {
        match capability {
            Capability::SpeechToText => &self.speech,
            Capability::Decomposition => &self.decomposition,
            Capability::Search => &self.search,
            Capability::Verification => &self.verification,
        }
    }
}
