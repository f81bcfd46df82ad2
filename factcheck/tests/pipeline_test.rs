use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use common::Config;
use factcheck::credentials::{GEMINI_PLACEHOLDER, SERPER_PLACEHOLDER};
use factcheck::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use factcheck::pipeline::Clock;
use factcheck::search::{EvidenceItem, SearchProvider};
use factcheck::{Credentials, FactChecker, Verdict};

struct StubSearch {
    outcome: std::result::Result<Vec<EvidenceItem>, String>,
    calls: AtomicUsize,
    last_query: Mutex<Option<String>>,
}

impl StubSearch {
    fn returning(items: Vec<EvidenceItem>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(items),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, query: &str) -> Result<Vec<EvidenceItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.to_string());
        match &self.outcome {
            Ok(items) => Ok(items.clone()),
            Err(message) => Err(anyhow::anyhow!(message.clone())),
        }
    }
}

struct StubLlm {
    outcome: std::result::Result<Option<String>, String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl StubLlm {
    fn answering(text: &str) -> Arc<Self> {
        Self::with_outcome(Ok(Some(text.to_string())))
    }

    fn with_outcome(outcome: std::result::Result<Option<String>, String>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for StubLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(request.prompt);
        match &self.outcome {
            Ok(content) => Ok(LlmResponse {
                content: content.clone(),
                usage: UsageMetadata::default(),
                model: "stub".to_string(),
            }),
            Err(message) => Err(anyhow::anyhow!(message.clone())),
        }
    }
}

/// Each call to `now` advances by a fixed step
struct StepClock {
    base: Instant,
    step: Duration,
    ticks: AtomicU32,
}

impl StepClock {
    fn new(step: Duration) -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            step,
            ticks: AtomicU32::new(0),
        })
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.base + self.step * n
    }
}

fn evidence(n: usize) -> Vec<EvidenceItem> {
    (1..=n)
        .map(|i| EvidenceItem {
            title: format!("Article {}", i),
            link: format!("https://news.example/{}", i),
            snippet: format!("Snippet {}", i),
        })
        .collect()
}

fn valid_credentials() -> Credentials {
    Credentials::new("gemini-key", "serper-key")
}

const JSON_ANSWER: &str = r#"{"verdict": "True", "reasoning": "Multiple sources agree."}"#;

#[tokio::test]
async fn test_sources_and_supporting_articles_track_evidence() {
    for n in 0..=5 {
        let search = StubSearch::returning(evidence(n));
        let llm = StubLlm::answering(JSON_ANSWER);
        let checker = FactChecker::new(valid_credentials(), search.clone(), llm.clone());

        let result = checker.check("Water boils at 100C at sea level").await;

        assert_eq!(result.final_verdict, Verdict::True);
        assert_eq!(result.reasoning, "Multiple sources agree.");
        assert_eq!(result.sources_verified, n);
        assert_eq!(result.supporting_articles, evidence(n.min(3)));
        assert!(result.execution_time >= 0.0);
    }
}

#[tokio::test]
async fn test_evidence_is_capped_at_five() {
    let search = StubSearch::returning(evidence(8));
    let llm = StubLlm::answering(JSON_ANSWER);
    let checker = FactChecker::new(valid_credentials(), search.clone(), llm.clone());

    let result = checker.check("Some claim").await;

    assert_eq!(result.sources_verified, 5);
    assert_eq!(result.supporting_articles, evidence(3));
    let prompt = llm.last_prompt.lock().unwrap().clone().expect("prompt sent");
    assert!(prompt.contains("Title: Article 5"));
    assert!(!prompt.contains("Title: Article 6"));
}

#[tokio::test]
async fn test_search_query_is_prefixed() {
    let search = StubSearch::returning(evidence(1));
    let llm = StubLlm::answering(JSON_ANSWER);
    let checker = FactChecker::new(valid_credentials(), search.clone(), llm.clone());

    checker.check("Cats can see in total darkness").await;

    assert_eq!(
        search.last_query.lock().unwrap().as_deref(),
        Some("fact check Cats can see in total darkness")
    );
    let prompt = llm.last_prompt.lock().unwrap().clone().expect("prompt sent");
    assert!(prompt.contains("Cats can see in total darkness"));
    assert!(prompt.contains("Title: Article 1\nSnippet: Snippet 1"));
    assert!(!prompt.contains("https://news.example/1"));
}

#[tokio::test]
async fn test_missing_gemini_key_never_touches_network() {
    for gemini in [None, Some(String::new()), Some(GEMINI_PLACEHOLDER.to_string())] {
        let search = StubSearch::returning(evidence(3));
        let llm = StubLlm::answering(JSON_ANSWER);
        let credentials = Credentials {
            gemini_api_key: gemini,
            serper_api_key: Some("serper-key".to_string()),
        };
        let checker = FactChecker::new(credentials, search.clone(), llm.clone());

        let result = checker.check("Some claim").await;

        assert_eq!(result.final_verdict, Verdict::ConfigurationError);
        assert!(result.reasoning.contains("GEMINI_API_KEY"));
        assert!(result.supporting_articles.is_empty());
        assert_eq!(result.sources_verified, 0);
        assert!(result.execution_time >= 0.0);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_missing_serper_key_is_reported_separately() {
    for serper in [None, Some(String::new()), Some(SERPER_PLACEHOLDER.to_string())] {
        let search = StubSearch::returning(evidence(3));
        let llm = StubLlm::answering(JSON_ANSWER);
        let credentials = Credentials {
            gemini_api_key: Some("gemini-key".to_string()),
            serper_api_key: serper,
        };
        let checker = FactChecker::new(credentials, search.clone(), llm.clone());

        let result = checker.check("Some claim").await;

        assert_eq!(result.final_verdict, Verdict::ConfigurationError);
        assert!(result.reasoning.contains("SERPER_API_KEY"));
        assert!(!result.reasoning.contains("GEMINI_API_KEY"));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_search_failure_still_runs_synthesis() {
    let search = StubSearch::failing("Search API error 500 Internal Server Error");
    let llm = StubLlm::answering(r#"{"verdict": "Unverified", "reasoning": "No evidence available."}"#);
    let checker = FactChecker::new(valid_credentials(), search.clone(), llm.clone());

    let result = checker.check("The Eiffel Tower is in Rome").await;

    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.final_verdict, Verdict::Unverified);
    assert_eq!(result.sources_verified, 0);
    assert!(result.supporting_articles.is_empty());
}

#[tokio::test]
async fn test_embedded_json_is_extracted_from_prose() {
    let text = r#"After reviewing the sources, here is my answer:
{"verdict": "False", "reasoning": "The claim contradicts official records."}
Let me know if you need more detail."#;
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(2)),
        StubLlm::answering(text),
    );

    let result = checker.check("The moon landing happened in 1975").await;

    assert_eq!(result.final_verdict, Verdict::False);
    assert_eq!(result.reasoning, "The claim contradicts official records.");
}

#[tokio::test]
async fn test_prose_without_json_is_unverified() {
    let text = "I could not find reliable sources either confirming or denying this claim.";
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(1)),
        StubLlm::answering(text),
    );

    let result = checker.check("Aliens built the pyramids").await;

    assert_eq!(result.final_verdict, Verdict::Unverified);
    assert_eq!(result.reasoning, text);
    assert_eq!(result.sources_verified, 1);
}

#[tokio::test]
async fn test_no_candidates_is_error() {
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(4)),
        StubLlm::with_outcome(Ok(None)),
    );

    let result = checker.check("Some claim").await;

    assert_eq!(result.final_verdict, Verdict::Error);
    assert_eq!(result.reasoning, "No response from Gemini API");
    assert_eq!(result.sources_verified, 4);
    assert_eq!(result.supporting_articles.len(), 3);
}

#[tokio::test]
async fn test_empty_model_text_is_error() {
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(2)),
        StubLlm::with_outcome(Ok(Some(String::new()))),
    );

    let result = checker.check("Some claim").await;

    assert_eq!(result.final_verdict, Verdict::Error);
    assert_eq!(result.reasoning, "No response from Gemini API");
    assert_eq!(result.sources_verified, 2);
}

#[tokio::test]
async fn test_model_failure_is_error_with_cause() {
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(2)),
        StubLlm::with_outcome(Err("Gemini request timed out".to_string())),
    );

    let result = checker.check("Some claim").await;

    assert_eq!(result.final_verdict, Verdict::Error);
    assert!(result.reasoning.starts_with("API error: "));
    assert!(result.reasoning.contains("Gemini request timed out"));
}

#[tokio::test]
async fn test_missing_fields_fall_back_to_defaults() {
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(1)),
        StubLlm::answering(r#"{"reasoning": "Sources are inconclusive."}"#),
    );

    let result = checker.check("Some claim").await;

    assert_eq!(result.final_verdict, Verdict::UnableToDetermine);
    assert_eq!(result.final_verdict.as_str(), "Unable to determine");
    assert_eq!(result.reasoning, "Sources are inconclusive.");

    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(1)),
        StubLlm::answering(r#"{"verdict": "True"}"#),
    );

    let result = checker.check("Some claim").await;

    assert_eq!(result.final_verdict, Verdict::True);
    assert_eq!(result.reasoning, "Analysis could not be completed");
}

#[tokio::test]
async fn test_malformed_verdict_object_is_unverified_raw_text() {
    let text = r#"Verdict: {"verdict": "False", "reasoning": "debunked", "sources": [{"id": 1}],} end"#;
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(1)),
        StubLlm::answering(text),
    );

    let result = checker.check("Some claim").await;

    assert_eq!(result.final_verdict, Verdict::Unverified);
    assert_eq!(result.reasoning, text);
}

#[tokio::test]
async fn test_unknown_verdict_is_passed_through() {
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(1)),
        StubLlm::answering(r#"{"verdict": "Mostly False", "reasoning": "Partly exaggerated."}"#),
    );

    let result = checker.check("Some claim").await;

    assert_eq!(result.final_verdict, Verdict::Other("Mostly False".to_string()));
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["final_verdict"], "Mostly False");
}

#[tokio::test]
async fn test_empty_claim_is_caught_at_top_level() {
    let search = StubSearch::returning(evidence(3));
    let llm = StubLlm::answering(JSON_ANSWER);
    let checker = FactChecker::new(valid_credentials(), search.clone(), llm.clone());

    let result = checker.check("   ").await;

    assert_eq!(result.final_verdict, Verdict::Error);
    assert!(result
        .reasoning
        .starts_with("An error occurred during fact-checking:"));
    assert_eq!(result.sources_verified, 0);
    assert!(result.supporting_articles.is_empty());
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_execution_time_uses_injected_clock() {
    let checker = FactChecker::new(
        valid_credentials(),
        StubSearch::returning(evidence(2)),
        StubLlm::answering(JSON_ANSWER),
    )
    .with_clock(StepClock::new(Duration::from_millis(1500)));

    let result = checker.check("Some claim").await;
    assert_eq!(result.execution_time, 1.5);

    let misconfigured = FactChecker::new(
        Credentials::default(),
        StubSearch::returning(evidence(2)),
        StubLlm::answering(JSON_ANSWER),
    )
    .with_clock(StepClock::new(Duration::from_millis(250)));

    let result = misconfigured.check("Some claim").await;
    assert_eq!(result.final_verdict, Verdict::ConfigurationError);
    assert_eq!(result.execution_time, 0.25);
}

#[tokio::test]
async fn test_end_to_end_against_mock_providers() {
    let mut server = mockito::Server::new_async().await;

    let search_mock = server
        .mock("POST", "/search")
        .match_header("x-api-key", "serper-key")
        .with_status(500)
        .with_body("upstream failure")
        .create_async()
        .await;

    let gemini_mock = server
        .mock("POST", "/models/gemini-1.5-flash:generateContent")
        .match_query(mockito::Matcher::UrlEncoded("key".into(), "gemini-key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "candidates": [{
                    "content": {"parts": [{"text": "```json\n{\"verdict\": \"Misleading\", \"reasoning\": \"Out of context.\"}\n```"}]}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let config: Config = toml::from_str(&format!(
        "[search]\napi_url = \"{url}/search\"\n\n[llm]\napi_url = \"{url}\"\n",
        url = server.url()
    ))
    .expect("config");

    let checker = FactChecker::from_config(&config, valid_credentials());
    let result = checker.check("A viral photo shows a shark on a highway").await;

    assert_eq!(result.final_verdict, Verdict::Misleading);
    assert_eq!(result.reasoning, "Out of context.");
    assert_eq!(result.sources_verified, 0);
    assert!(result.supporting_articles.is_empty());

    search_mock.assert_async().await;
    gemini_mock.assert_async().await;
}

#[tokio::test]
async fn test_llm_generation_settings_come_from_config() {
    let mut server = mockito::Server::new_async().await;

    let _search_mock = server
        .mock("POST", "/search")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"organic": []}"#)
        .create_async()
        .await;

    let gemini_mock = server
        .mock("POST", "/models/gemini-1.5-flash:generateContent")
        .match_query(mockito::Matcher::UrlEncoded("key".into(), "gemini-key".into()))
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "generationConfig": {"maxOutputTokens": 512, "temperature": 0.5}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": JSON_ANSWER}]}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let config: Config = toml::from_str(&format!(
        "[search]\napi_url = \"{url}/search\"\n\n[llm]\napi_url = \"{url}\"\nmax_tokens = 512\ntemperature = 0.5\n",
        url = server.url()
    ))
    .expect("config");

    let checker = FactChecker::from_config(&config, valid_credentials());
    let result = checker.check("Some claim").await;

    assert_eq!(result.final_verdict, Verdict::True);
    gemini_mock.assert_async().await;
}
