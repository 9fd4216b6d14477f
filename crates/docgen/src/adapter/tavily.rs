//! TavilySearch - web search over the Tavily REST API.

use super::{SearchAdapter, SearchError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

const BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_MAX_RESULTS: u32 = 5;

/// Search adapter backed by Tavily.
#[derive(Clone)]
pub struct TavilySearch {
    client: Client,
    base_url: String,
    api_key: String,
    max_results: u32,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            api_key: api_key.into(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Loads the API key from `TAVILY_API_KEY`.
    pub fn try_from_env() -> Result<Self, SearchError> {
        let api_key = env::var("TAVILY_API_KEY").map_err(|_| {
            SearchError::Unavailable("TAVILY_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.max(1);
        self
    }
}

#[async_trait]
impl SearchAdapter for TavilySearch {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
            search_depth: "basic",
            include_answer: true,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| SearchError::failed(query, format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::failed(
                query,
                format!("HTTP {}: {}", status.as_u16(), body.trim()),
            ));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|err| SearchError::failed(query, format!("invalid response: {err}")))?;

        debug!(query, results = parsed.results.len(), "Search complete");
        Ok(render_results(&parsed))
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    search_depth: &'static str,
    include_answer: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Answer first (when present), then one `title\nurl\ncontent` block per result.
fn render_results(response: &SearchResponse) -> String {
    let mut blocks = Vec::with_capacity(response.results.len() + 1);

    if let Some(answer) = response.answer.as_deref()
        && !answer.trim().is_empty()
    {
        blocks.push(answer.trim().to_string());
    }

    blocks.extend(
        response
            .results
            .iter()
            .map(|result| format!("{}\n{}\n{}", result.title, result.url, result.content.trim())),
    );

    blocks.join("\n\n")
}
