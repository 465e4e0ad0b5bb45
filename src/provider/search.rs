use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::error::{ProviderError, parse_retry_after};
use super::types::SearchHit;
use super::SearchProvider;

pub const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// The API rejects `num` above this.
pub const MAX_RESULTS_PER_QUERY: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google Custom Search JSON API client.
#[derive(Debug, Clone)]
pub struct GoogleSearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    num_results: usize,
}

impl GoogleSearchClient {
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        num_results: usize,
    ) -> Self {
        Self {
            http,
            endpoint: GOOGLE_SEARCH_URL.to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            num_results: num_results.clamp(1, MAX_RESULTS_PER_QUERY),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn num_results(&self) -> usize {
        self.num_results
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProviderError> {
        let num = self.num_results.to_string();
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("num", num.as_str()),
            ])
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

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("search body: {e}")))?;

        debug!(query_len = query.len(), hits = body.items.len(), "Search returned");

        Ok(body
            .items
            .into_iter()
            .map(|item| SearchHit::new(item.title, item.link, item.snippet))
            .collect())
    }
}
