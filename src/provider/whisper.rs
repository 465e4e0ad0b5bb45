use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use super::error::{ProviderError, parse_retry_after};
use super::types::Transcription;
use super::SpeechToText;

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Client for a Whisper-style HTTP transcription service.
#[derive(Debug, Clone)]
pub struct WhisperClient {
    http: reqwest::Client,
    base_url: String,
}

impl WhisperClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription, ProviderError> {
        let url = format!("{}/transcribe", self.base_url);
        let part = Part::bytes(audio.to_vec()).file_name("audio.wav");
        let form = Form::new().part("file", part);

        debug!(url = %url, bytes = audio.len(), "Sending audio for transcription");

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(
                resp.headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), retry_after, &body));
        }

        let body: TranscribeResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("transcription body: {e}")))?;

        Ok(Transcription {
            text: body.text.trim().to_string(),
            language: body.language,
            duration_secs: body.duration,
        })
    }

    async fn health(&self) -> Result<(), ProviderError> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&e))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::from_status(resp.status().as_u16(), None, ""))
        }
    }
}
