use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::search::EvidenceItem;

pub const MAX_SUPPORTING_ARTICLES: usize = 3;

/// Verdict label attached to a fact-check outcome.
///
/// The model is asked for one of the first five labels, but its answer is not
/// coerced: any other string is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    True,
    False,
    PartiallyTrue,
    Misleading,
    Unverified,
    Error,
    ConfigurationError,
    UnableToDetermine,
    Other(String),
}

impl Verdict {
    pub fn as_str(&self) -> &str {
        match self {
            Verdict::True => "True",
            Verdict::False => "False",
            Verdict::PartiallyTrue => "Partially True",
            Verdict::Misleading => "Misleading",
            Verdict::Unverified => "Unverified",
            Verdict::Error => "Error",
            Verdict::ConfigurationError => "Configuration Error",
            Verdict::UnableToDetermine => "Unable to determine",
            Verdict::Other(label) => label,
        }
    }
}

impl From<&str> for Verdict {
    fn from(label: &str) -> Self {
        match label {
            "True" => Verdict::True,
            "False" => Verdict::False,
            "Partially True" => Verdict::PartiallyTrue,
            "Misleading" => Verdict::Misleading,
            "Unverified" => Verdict::Unverified,
            "Error" => Verdict::Error,
            "Configuration Error" => Verdict::ConfigurationError,
            "Unable to determine" => Verdict::UnableToDetermine,
            other => Verdict::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Verdict::from(label.as_str()))
    }
}

/// Structured outcome of one fact-check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictResult {
    pub final_verdict: Verdict,
    pub reasoning: String,
    /// Top evidence items, in provider order
    pub supporting_articles: Vec<EvidenceItem>,
    /// Number of evidence items retrieved, including those not listed above
    pub sources_verified: usize,
    /// Wall-clock seconds spent on the check
    pub execution_time: f64,
}

impl VerdictResult {
    /// Outcome carrying no evidence (configuration problems and unexpected failures)
    pub fn without_evidence(verdict: Verdict, reasoning: impl Into<String>, execution_time: f64) -> Self {
        Self {
            final_verdict: verdict,
            reasoning: reasoning.into(),
            supporting_articles: Vec::new(),
            sources_verified: 0,
            execution_time,
        }
    }
}
