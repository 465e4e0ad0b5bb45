//! External collaborators.
//!
//! The pipeline only ever talks to these traits. Concrete adapters:
//! - [`WhisperClient`]: HTTP speech-to-text service (`POST /transcribe`, `GET /health`)
//! - [`GoogleSearchClient`]: Google Custom Search JSON API
//! - [`GenaiClaimService`]: language model for decomposition and verification via `genai`
//! - [`KeywordBaselineVerifier`]: lexical verifier usable without a model
//!
//! Scripted mocks live behind `#[cfg(any(test, feature = "mock"))]`.

pub mod baseline;
pub mod error;
pub mod llm;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod parse;
pub mod search;
pub mod types;
pub mod whisper;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

pub use baseline::KeywordBaselineVerifier;
pub use error::{FailureClass, ProviderError, parse_retry_after};
pub use llm::GenaiClaimService;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockDecomposer, MockSearch, MockSpeech, MockVerifier};
pub use search::GoogleSearchClient;
pub use types::{ExtractedClaim, SearchHit, Transcription, VerifierResponse};
pub use whisper::WhisperClient;

use crate::model::Evidence;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription, ProviderError>;

    /// Liveness of the backing service. Defaults to healthy.
    async fn health(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[async_trait]
pub trait ClaimDecomposer: Send + Sync {
    async fn decompose(&self, transcript: &str) -> Result<Vec<ExtractedClaim>, ProviderError>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// An empty result is a valid answer, not an error.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError>;
}

#[async_trait]
pub trait Verifier: Send + Sync {
    /// `evidence` is already ranked; citations in the response index into it.
    async fn verify(
        &self,
        claim: &str,
        evidence: &[Evidence],
    ) -> Result<VerifierResponse, ProviderError>;
}
