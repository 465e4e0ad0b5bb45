//! Scripted collaborators for tests.
//!
//! Each mock answers through a closure, optionally after a fixed delay, and counts calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::model::{Evidence, VerdictLabel};

use super::error::ProviderError;
use super::types::{ExtractedClaim, SearchHit, Transcription, VerifierResponse};
use super::{ClaimDecomposer, SearchProvider, SpeechToText, Verifier};

type SearchFn = dyn Fn(&str) -> Result<Vec<SearchHit>, ProviderError> + Send + Sync;
type VerifyFn = dyn Fn(&str, &[Evidence]) -> Result<VerifierResponse, ProviderError> + Send + Sync;
type DecomposeFn = dyn Fn(&str) -> Result<Vec<ExtractedClaim>, ProviderError> + Send + Sync;
type TranscribeFn = dyn Fn(&[u8]) -> Result<Transcription, ProviderError> + Send + Sync;

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

pub struct MockSearch {
    respond: Box<SearchFn>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<SearchHit>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(hits: Vec<SearchHit>) -> Self {
        Self::new(move |_| Ok(hits.clone()))
    }

    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.to_string());
        pause(self.delay).await;
        (self.respond)(query)
    }
}

pub struct MockVerifier {
    respond: Box<VerifyFn>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockVerifier {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, &[Evidence]) -> Result<VerifierResponse, ProviderError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers `label`, citing the top-ranked evidence item.
    pub fn answering(label: VerdictLabel, confidence: f32) -> Self {
        Self::new(move |_, evidence| {
            Ok(VerifierResponse {
                label,
                confidence,
                explanation: format!("scripted {label}"),
                citations: if evidence.is_empty() { vec![] } else { vec![0] },
            })
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for MockVerifier {
    async fn verify(
        &self,
        claim: &str,
        evidence: &[Evidence],
    ) -> Result<VerifierResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        pause(self.delay).await;
        (self.respond)(claim, evidence)
    }
}

pub struct MockDecomposer {
    respond: Box<DecomposeFn>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockDecomposer {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<ExtractedClaim>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(claims: Vec<ExtractedClaim>) -> Self {
        Self::new(move |_| Ok(claims.clone()))
    }

    /// One factual claim per text.
    pub fn with_texts(texts: &[&str]) -> Self {
        Self::returning(texts.iter().map(|t| ExtractedClaim::factual(*t)).collect())
    }

    pub fn failing(err: ProviderError) -> Self {
        Self::new(move |_| Err(err.clone()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimDecomposer for MockDecomposer {
    async fn decompose(&self, transcript: &str) -> Result<Vec<ExtractedClaim>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        pause(self.delay).await;
        (self.respond)(transcript)
    }
}

pub struct MockSpeech {
    respond: Box<TranscribeFn>,
    healthy: bool,
    calls: AtomicUsize,
}

impl MockSpeech {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Transcription, ProviderError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            healthy: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| {
            Ok(Transcription {
                text: text.clone(),
                language: Some("en".to_string()),
                duration_secs: Some(30.0),
            })
        })
    }

    pub fn failing(err: ProviderError) -> Self {
        Self::new(move |_| Err(err.clone()))
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for MockSpeech {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(audio)
    }

    async fn health(&self) -> Result<(), ProviderError> {
        if self.healthy {
            Ok(())
        } else {
            Err(ProviderError::transient("speech service unavailable"))
        }
    }
}
