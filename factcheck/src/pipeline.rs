use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

use common::Config;

use crate::credentials::Credentials;
use crate::llm::gemini::GeminiProvider;
use crate::llm::LlmProvider;
use crate::search::serper::SerperClient;
use crate::search::{retrieve_evidence, EvidenceItem, SearchProvider};
use crate::synthesis::{synthesize_verdict, Analysis};
use crate::verdict::{Verdict, VerdictResult, MAX_SUPPORTING_ARTICLES};

pub const DEFAULT_REASONING: &str = "Analysis could not be completed";

/// Time source for execution-time measurement
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Runs configuration check, evidence retrieval and verdict synthesis in sequence.
///
/// Holds no mutable state, so one instance can serve concurrent callers.
#[derive(Clone)]
pub struct FactChecker {
    credentials: Credentials,
    search: Arc<dyn SearchProvider>,
    llm: Arc<dyn LlmProvider>,
    clock: Arc<dyn Clock>,
}

impl FactChecker {
    pub fn new(
        credentials: Credentials,
        search: Arc<dyn SearchProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            credentials,
            search,
            llm,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build the Serper and Gemini clients from configuration and explicit keys.
    /// Missing keys are not an error here; `check` reports them as a verdict.
    pub fn from_config(config: &Config, credentials: Credentials) -> Self {
        let search = SerperClient::new(
            config.search.api_url(),
            credentials.serper_api_key.clone().unwrap_or_default(),
        )
        .with_defaults(config.search.timeout_seconds(), config.search.max_results());

        let llm = GeminiProvider::new(
            config.llm.api_url(),
            credentials.gemini_api_key.clone().unwrap_or_default(),
            config.llm.model(),
        )
        .with_timeout(config.llm.timeout_seconds())
        .with_generation(config.llm.max_tokens, config.llm.temperature);

        Self::new(credentials, Arc::new(search), Arc::new(llm))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fact-check a claim. Always returns a result; failures are expressed in its verdict.
    pub async fn check(&self, claim: &str) -> VerdictResult {
        let check_id = uuid::Uuid::new_v4();
        self.check_inner(claim)
            .instrument(info_span!("fact_check", %check_id))
            .await
    }

    async fn check_inner(&self, claim: &str) -> VerdictResult {
        let start = self.clock.now();

        if let Some(missing) = self.credentials.missing() {
            warn!("fact check aborted: {:?} credential not configured", missing);
            return VerdictResult::without_evidence(
                Verdict::ConfigurationError,
                missing.reasoning(),
                self.elapsed_secs(start),
            );
        }

        match self.run_stages(claim).await {
            Ok((analysis, evidence)) => {
                let result = VerdictResult {
                    final_verdict: analysis.verdict.unwrap_or(Verdict::UnableToDetermine),
                    reasoning: analysis
                        .reasoning
                        .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
                    supporting_articles: evidence
                        .iter()
                        .take(MAX_SUPPORTING_ARTICLES)
                        .cloned()
                        .collect(),
                    sources_verified: evidence.len(),
                    execution_time: self.elapsed_secs(start),
                };
                info!(
                    verdict = %result.final_verdict,
                    sources = result.sources_verified,
                    "fact check completed in {:.2}s",
                    result.execution_time
                );
                result
            }
            Err(e) => {
                error!("fact check failed: {:#}", e);
                VerdictResult::without_evidence(
                    Verdict::Error,
                    format!("An error occurred during fact-checking: {:#}", e),
                    self.elapsed_secs(start),
                )
            }
        }
    }

    async fn run_stages(&self, claim: &str) -> Result<(Analysis, Vec<EvidenceItem>)> {
        if claim.trim().is_empty() {
            anyhow::bail!("claim must not be empty");
        }

        let evidence = retrieve_evidence(self.search.as_ref(), claim).await;
        let analysis = synthesize_verdict(self.llm.as_ref(), claim, &evidence).await;
        Ok((analysis, evidence))
    }

    fn elapsed_secs(&self, start: Instant) -> f64 {
        self.clock.now().saturating_duration_since(start).as_secs_f64()
    }
}
