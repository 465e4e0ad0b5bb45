//! Orchestrator harness with scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use claimflow::client::{ClientConfig, ClientSet, ClientsConfig};
use claimflow::config::PipelineConfig;
use claimflow::metrics::{LogRecorder, MetricsSink};
use claimflow::model::VerdictLabel;
use claimflow::orchestrator::{Capabilities, VideoOrchestrator};
use claimflow::provider::{
    ClaimDecomposer, MockDecomposer, MockVerifier, ProviderError, SearchHit, SearchProvider,
    SpeechToText, Verifier,
};
use claimflow::storage::{MemoryStore, Store};

pub const VIDEO_ID: &str = "vid-scenario";

pub fn policy(max_attempts: u32) -> ClientConfig {
    ClientConfig {
        max_in_flight: 8,
        max_attempts,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(400),
        jitter: Duration::ZERO,
        call_timeout: Duration::from_secs(1),
    }
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        worker_pool_size: 4,
        top_k: 3,
        min_relevance: 0.0,
        queries_per_claim: 1,
        claim_deadline: None,
        video_deadline: None,
    }
}

pub fn hit(n: usize, topic: &str) -> SearchHit {
    SearchHit::new(
        format!("{topic} source {n}"),
        format!("https://en.wikipedia.org/wiki/{topic}_{n}"),
        format!("Reference material about {topic}, entry {n}."),
    )
}

/// How [`RoutedSearch`] answers queries containing a keyword.
#[derive(Clone)]
pub enum Route {
    Hits(Vec<SearchHit>),
    /// Never answers within any sane call timeout.
    Hang,
}

/// Search provider answering by the first route whose keyword appears in the query.
///
/// Unmatched queries return no hits.
pub struct RoutedSearch {
    routes: Vec<(String, Route)>,
}

impl RoutedSearch {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route(mut self, keyword: &str, route: Route) -> Self {
        self.routes.push((keyword.to_lowercase(), route));
        self
    }
}

#[async_trait]
impl SearchProvider for RoutedSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        let query = query.to_lowercase();
        let route = self
            .routes
            .iter()
            .find(|(keyword, _)| query.contains(keyword.as_str()))
            .map(|(_, route)| route.clone());

        match route {
            Some(Route::Hits(hits)) => Ok(hits),
            Some(Route::Hang) => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }
}

pub struct Harness {
    pub orchestrator: VideoOrchestrator,
    pub store: Arc<dyn Store>,
    pub recorder: Arc<LogRecorder>,
}

pub struct HarnessBuilder {
    decomposer: Arc<dyn ClaimDecomposer>,
    search: Arc<dyn SearchProvider>,
    verifier: Arc<dyn Verifier>,
    speech: Option<Arc<dyn SpeechToText>>,
    store: Arc<dyn Store>,
    clients: ClientsConfig,
    config: PipelineConfig,
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl HarnessBuilder {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            decomposer: Arc::new(MockDecomposer::with_texts(texts)),
            search: Arc::new(RoutedSearch::new()),
            verifier: Arc::new(MockVerifier::answering(VerdictLabel::Supported, 0.9)),
            speech: None,
            store: Arc::new(MemoryStore::new()),
            clients: ClientsConfig::uniform(policy(4)),
            config: pipeline_config(),
            sinks: Vec::new(),
        }
    }

    pub fn decomposer(mut self, decomposer: impl ClaimDecomposer + 'static) -> Self {
        self.decomposer = Arc::new(decomposer);
        self
    }

    pub fn search(mut self, search: impl SearchProvider + 'static) -> Self {
        self.search = Arc::new(search);
        self
    }

    pub fn verifier(mut self, verifier: impl Verifier + 'static) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    pub fn shared_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = store;
        self
    }

    pub fn clients(mut self, clients: ClientsConfig) -> Self {
        self.clients = clients;
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn build(self) -> Harness {
        let recorder = self
            .sinks
            .into_iter()
            .fold(LogRecorder::new(10_000), LogRecorder::with_sink);
        let recorder = Arc::new(recorder);
        let clients = ClientSet::new(&self.clients, recorder.clone());
        let capabilities = Capabilities {
            speech: self.speech,
            decomposer: self.decomposer,
            search: self.search,
            verifier: self.verifier,
        };
        let orchestrator =
            VideoOrchestrator::new(capabilities, clients, self.store.clone(), self.config)
                .expect("valid pipeline config");
        Harness {
            orchestrator,
            store: self.store,
            recorder,
        }
    }
}
