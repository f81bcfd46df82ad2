/*!
common/src/lib.rs

Shared configuration types and helpers for Factcheck.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default/override merging
- A helper to resolve API keys from the process environment
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SEARCH_URL: &str = "https://google.serper.dev/search";
pub const DEFAULT_LLM_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_NEWS_URL: &str = "https://newsapi.org/v2/top-headlines";

/// Most search results a fact-check may request
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Web search provider configuration (Serper)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    pub api_url: Option<String>,
    /// Name of the environment variable holding the Serper key
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_results: Option<usize>,
}

impl SearchConfig {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_SEARCH_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("SERPER_API_KEY")
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }

    /// Clamped to `MAX_SEARCH_RESULTS`; `Config::validate` rejects larger values outright.
    pub fn max_results(&self) -> usize {
        self.max_results.unwrap_or(MAX_SEARCH_RESULTS).min(MAX_SEARCH_RESULTS)
    }
}

/// Generative model configuration (Gemini)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the generative language API, without the `/models/...` suffix
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    /// Sent as `generationConfig.maxOutputTokens` when set
    pub max_tokens: Option<usize>,
    /// Sent as `generationConfig.temperature` when set
    pub temperature: Option<f32>,
}

impl LlmConfig {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_LLM_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("GEMINI_API_KEY")
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_LLM_MODEL)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }
}

/// Top headlines configuration (NewsAPI)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub page_size: Option<u32>,
}

impl NewsConfig {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_NEWS_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("NEWS_API_KEY")
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }

    pub fn country(&self) -> &str {
        self.country.as_deref().unwrap_or("us")
    }

    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or("general")
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(8)
    }
}

/// HTTP server bind settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

impl ServerConfig {
    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(3001)
    }
}

/// Top-level application configuration (deserialized from config.toml).
/// Every section is optional; an empty file yields the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path).await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject endpoint URLs that cannot be parsed and out-of-range result counts, so
    /// misconfiguration shows up at startup rather than as a swallowed retrieval error.
    pub fn validate(&self) -> Result<()> {
        for (section, api_url) in [
            ("search", self.search.api_url()),
            ("llm", self.llm.api_url()),
            ("news", self.news.api_url()),
        ] {
            url::Url::parse(api_url)
                .with_context(|| format!("Invalid [{}] api_url: {}", section, api_url))?;
        }

        if let Some(max_results) = self.search.max_results.filter(|n| *n == 0 || *n > MAX_SEARCH_RESULTS) {
            anyhow::bail!(
                "[search] max_results must be between 1 and {}, got {}",
                MAX_SEARCH_RESULTS,
                max_results
            );
        }
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read an API key from the environment. Unset and blank variables both yield `None`.
pub fn read_secret(env_name: &str) -> Option<String> {
    std::env::var(env_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
