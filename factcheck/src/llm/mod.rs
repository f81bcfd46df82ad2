use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Core trait for generative model providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into() }
    }
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text of the first candidate; `None` when the provider produced no candidate
    pub content: Option<String>,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod gemini;

/// Find the verdict object embedded in model output.
///
/// A fenced ```json block wins if it holds one. Otherwise each `{` is tried in
/// order and a single JSON value is streamed from there, so objects with nested
/// braces parse whole and trailing prose is ignored. Only objects carrying a
/// `verdict` or `reasoning` key count: a malformed verdict object must not be
/// replaced by some unrelated object nested inside it.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            if let Ok(Value::Object(map)) = serde_json::from_str(rest[..end].trim()) {
                if is_verdict_object(&map) {
                    return Some(map);
                }
            }
        }
    }

    for (start, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = stream.next() {
            if is_verdict_object(&map) {
                return Some(map);
            }
        }
    }

    None
}

fn is_verdict_object(map: &Map<String, Value>) -> bool {
    map.contains_key("verdict") || map.contains_key("reasoning")
}
