// Verdict synthesis: claim + evidence -> model prompt -> verdict/reasoning pair
use std::fmt::Write;
use tracing::{debug, info, warn};

use crate::llm::{extract_json_object, LlmProvider, LlmRequest};
use crate::search::EvidenceItem;
use crate::verdict::Verdict;

pub const NO_RESPONSE_REASONING: &str = "No response from Gemini API";

/// Verdict and reasoning as produced by the model. Either may be absent when the
/// model answered with a JSON object lacking the field.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub verdict: Option<Verdict>,
    pub reasoning: Option<String>,
}

impl Analysis {
    fn new(verdict: Verdict, reasoning: impl Into<String>) -> Self {
        Self {
            verdict: Some(verdict),
            reasoning: Some(reasoning.into()),
        }
    }
}

/// Render the fact-checking prompt. Links are left out; only titles and snippets reach the model.
pub fn build_prompt(claim: &str, evidence: &[EvidenceItem]) -> String {
    let mut context = String::new();
    for item in evidence {
        let _ = writeln!(context, "Title: {}\nSnippet: {}", item.title, item.snippet);
    }

    format!(
        r#"You are a professional fact-checker. Analyze the following claim and the search results provided.

Claim to fact-check: "{}"

Search Results:
{}
Based on the search results, provide a fact-check analysis in the following JSON format:
{{
    "verdict": "True" | "False" | "Partially True" | "Misleading" | "Unverified",
    "reasoning": "Detailed explanation of your analysis and conclusion"
}}

Be thorough in your analysis and provide clear reasoning for your verdict.
"#,
        claim, context
    )
}

/// Ask the model for a verdict. Never fails: transport and API errors become an `Error` verdict.
pub async fn synthesize_verdict<P: LlmProvider + ?Sized>(
    provider: &P,
    claim: &str,
    evidence: &[EvidenceItem],
) -> Analysis {
    let request = LlmRequest::new(build_prompt(claim, evidence));

    match provider.generate(request).await {
        Ok(response) => {
            debug!(
                "synthesis: model {} used {} tokens",
                response.model, response.usage.total_tokens
            );
            match response.content {
                Some(text) if !text.is_empty() => parse_model_text(text),
                _ => {
                    warn!("synthesis: model returned no candidates");
                    Analysis::new(Verdict::Error, NO_RESPONSE_REASONING)
                }
            }
        }
        Err(e) => {
            warn!("synthesis: model request failed: {:#}", e);
            Analysis::new(Verdict::Error, format!("API error: {:#}", e))
        }
    }
}

/// Pull verdict/reasoning out of free text, falling back to `Unverified` with the raw text.
pub fn parse_model_text(text: String) -> Analysis {
    match extract_json_object(&text) {
        Some(map) => {
            info!("synthesis: structured verdict found in model output");
            Analysis {
                verdict: map.get("verdict").and_then(|v| v.as_str()).map(Verdict::from),
                reasoning: map.get("reasoning").and_then(|v| v.as_str()).map(str::to_string),
            }
        }
        None => {
            info!("synthesis: no JSON in model output, using raw text as reasoning");
            Analysis::new(Verdict::Unverified, text)
        }
    }
}
