use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{EvidenceItem, SearchProvider};

/// Google search through the Serper HTTP API
pub struct SerperClient {
    api_url: String,
    api_key: String,
    timeout: Duration,
    max_results: usize,
    client: reqwest::Client,
}

impl SerperClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            max_results: 5,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(mut self, timeout_secs: u64, max_results: usize) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self.max_results = max_results;
        self
    }
}

#[async_trait::async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str) -> Result<Vec<EvidenceItem>> {
        let req_body = SerperRequest {
            q: query,
            num: self.max_results,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&req_body)
            .send()
            .await
            .context("Search HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Search API error {}: {}", status, body);
        }

        let resp_body: SerperResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(resp_body
            .organic
            .into_iter()
            .take(self.max_results)
            .map(|hit| EvidenceItem {
                title: hit.title.unwrap_or_default(),
                link: hit.link.unwrap_or_default(),
                snippet: hit.snippet.unwrap_or_default(),
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}
