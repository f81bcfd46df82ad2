// Configuration guard: API keys must be present and not left at the .env template value.

use std::fmt;

pub const GEMINI_PLACEHOLDER: &str = "your_gemini_api_key_here";
pub const SERPER_PLACEHOLDER: &str = "your_serper_api_key_here";

/// The two secrets a fact-check needs. Values are never logged.
#[derive(Clone, Default)]
pub struct Credentials {
    pub gemini_api_key: Option<String>,
    pub serper_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("serper_api_key", &self.serper_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Which credential failed the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCredential {
    Gemini,
    Serper,
}

impl MissingCredential {
    pub fn reasoning(&self) -> &'static str {
        match self {
            MissingCredential::Gemini => {
                "Gemini API key not configured. Please set your GEMINI_API_KEY in the .env file."
            }
            MissingCredential::Serper => {
                "Serper API key not configured. Please set your SERPER_API_KEY in the .env file."
            }
        }
    }
}

impl Credentials {
    pub fn new(gemini_api_key: impl Into<String>, serper_api_key: impl Into<String>) -> Self {
        Self {
            gemini_api_key: Some(gemini_api_key.into()),
            serper_api_key: Some(serper_api_key.into()),
        }
    }

    /// Gemini is checked first, so a setup missing both keys reports Gemini.
    pub fn missing(&self) -> Option<MissingCredential> {
        if !is_configured(self.gemini_api_key.as_deref(), GEMINI_PLACEHOLDER) {
            return Some(MissingCredential::Gemini);
        }
        if !is_configured(self.serper_api_key.as_deref(), SERPER_PLACEHOLDER) {
            return Some(MissingCredential::Serper);
        }
        None
    }
}

fn is_configured(key: Option<&str>, placeholder: &str) -> bool {
    matches!(key, Some(k) if !k.is_empty() && k != placeholder)
}
