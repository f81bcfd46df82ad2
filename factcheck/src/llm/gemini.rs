use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// Google Gemini provider using the `generateContent` REST endpoint
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_output_tokens: Option<usize>,
    temperature: Option<f32>,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(30),
            max_output_tokens: None,
            temperature: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    /// Sampling settings sent as `generationConfig`; omitted entirely when both are unset.
    pub fn with_generation(mut self, max_output_tokens: Option<usize>, temperature: Option<f32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self.temperature = temperature;
        self
    }

    fn generation_config(&self) -> Option<GenerationConfig> {
        if self.max_output_tokens.is_none() && self.temperature.is_none() {
            return None;
        }
        Some(GenerationConfig {
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        })
    }

    /// `{base}/models/{model}:generateContent?key=...`
    fn endpoint(&self) -> Result<url::Url> {
        let mut endpoint = url::Url::parse(&format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        ))
        .context("Invalid Gemini endpoint URL")?;
        endpoint.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(endpoint)
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let req_body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(request.prompt),
                }],
            }],
            generation_config: self.generation_config(),
        };

        let endpoint = self.endpoint()?;

        // The key travels in the query string, so transport errors are stripped of their URL
        let exchange = async {
            let response = self
                .client
                .post(endpoint)
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send()
                .await
                .map_err(|e| e.without_url())
                .context("Gemini HTTP request failed")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Gemini API error {}: {}", status, body);
            }

            response
                .json::<GenerateContentResponse>()
                .await
                .map_err(|e| e.without_url())
                .context("Failed to parse Gemini response")
        };

        let resp_body = tokio::time::timeout(self.timeout, exchange)
            .await
            .context("Gemini request timed out")??;

        let content = resp_body.candidates.first().map(|candidate| {
            candidate
                .content
                .as_ref()
                .and_then(|c| c.parts.first())
                .and_then(|p| p.text.clone())
                .unwrap_or_default()
        });

        let usage = resp_body
            .usage_metadata
            .map(|u| UsageMetadata {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage,
            model: resp_body.model_version.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// Gemini API request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: Option<usize>,
    #[serde(default)]
    candidates_token_count: Option<usize>,
    #[serde(default)]
    total_token_count: Option<usize>,
}
