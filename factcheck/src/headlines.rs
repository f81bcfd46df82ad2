use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Parameters for a top-headlines request
#[derive(Debug, Clone)]
pub struct HeadlinesQuery {
    pub country: String,
    pub category: String,
    pub page: u32,
    pub page_size: u32,
}

impl Default for HeadlinesQuery {
    fn default() -> Self {
        Self {
            country: "us".to_string(),
            category: "general".to_string(),
            page: 1,
            page_size: 8,
        }
    }
}

/// One page of top headlines, in NewsAPI's wire shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlinesPage {
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub source: Option<ArticleSource>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Error reported by NewsAPI itself (`"status": "error"`), as opposed to a transport failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: String,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "news provider error: {}", self.message)
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    status: String,
    code: Option<String>,
    message: Option<String>,
}

/// Client for the NewsAPI top-headlines endpoint
pub struct NewsClient {
    api_url: String,
    api_key: String,
    client: Client,
}

impl NewsClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Factcheck/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Fetch one page of headlines. A `ProviderError` is returned (inside the
    /// `anyhow::Error`) when NewsAPI answers with an error status body.
    pub async fn top_headlines(&self, query: &HeadlinesQuery) -> Result<HeadlinesPage> {
        let page = query.page.to_string();
        let page_size = query.page_size.to_string();

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("country", query.country.as_str()),
                ("category", query.category.as_str()),
                ("apiKey", self.api_key.as_str()),
                ("page", page.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("headlines request failed")?;

        let status = response.status();
        let body = response.text().await.context("failed to read headlines body")?;

        // NewsAPI reports its own errors in the body, usually alongside a 4xx status
        if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
            if err.status == "error" {
                return Err(ProviderError {
                    code: err.code,
                    message: err.message.unwrap_or_else(|| "unknown error".to_string()),
                }
                .into());
            }
        }

        if !status.is_success() {
            anyhow::bail!("headlines fetch failed with status: {}", status);
        }

        let page: HeadlinesPage =
            serde_json::from_str(&body).context("failed to parse headlines response")?;
        info!(
            "headlines: {} articles ({} total) for {}/{}",
            page.articles.len(),
            page.total_results,
            query.country,
            query.category
        );
        Ok(page)
    }
}
