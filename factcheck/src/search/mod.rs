use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub mod serper;

/// Prefix prepended to every claim before it is sent to the search provider
pub const QUERY_PREFIX: &str = "fact check ";

/// Upper bound on evidence kept per check, whatever the provider returns
pub const MAX_EVIDENCE_ITEMS: usize = 5;

/// One search hit used as context for the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Web search backend returning relevance-ranked evidence
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<EvidenceItem>>;
}

/// Search evidence for a claim, degrading to an empty list on any failure.
///
/// Errors never reach the caller; they are reported as warnings so a broken
/// search backend still leaves the model with the bare claim.
pub async fn retrieve_evidence<P: SearchProvider + ?Sized>(provider: &P, claim: &str) -> Vec<EvidenceItem> {
    let query = format!("{}{}", QUERY_PREFIX, claim);
    match provider.search(&query).await {
        Ok(mut items) => {
            info!("search: {} evidence items retrieved", items.len());
            items.truncate(MAX_EVIDENCE_ITEMS);
            items
        }
        Err(e) => {
            warn!("search: evidence retrieval failed, continuing without evidence: {:#}", e);
            Vec::new()
        }
    }
}
