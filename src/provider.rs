//! Provider identification for outbound API calls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named external API endpoint family with its own rate-limit policy.
///
/// Covers the LLM vendors reached through model names plus the citation
/// services addressed by their literal service names. Anything that does not
/// match a known rule lands on [`Provider::Default`], which always has a
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "xai")]
    Xai,
    #[serde(rename = "semantic_scholar")]
    SemanticScholar,
    #[serde(rename = "scopus")]
    Scopus,
    #[serde(rename = "taylor_francis")]
    TaylorFrancis,
    #[serde(rename = "default")]
    Default,
}

impl Provider {
    /// Map a model or service name to its provider.
    ///
    /// Rules are ordered; the first match wins. Model-name substrings are
    /// checked before literal citation service names so that e.g. a
    /// deployment-prefixed model id still resolves.
    pub fn resolve(name: &str) -> Self {
        let name = name.to_lowercase();

        if name.contains("gpt") || name.starts_with("o1-") {
            Provider::OpenAi
        } else if name.contains("claude") {
            Provider::Anthropic
        } else if name.contains("gemini") {
            Provider::Google
        } else if name.contains("grok") {
            Provider::Xai
        } else {
            match name.as_str() {
                "openai" => Provider::OpenAi,
                "anthropic" => Provider::Anthropic,
                "google" => Provider::Google,
                "xai" => Provider::Xai,
                "semantic_scholar" => Provider::SemanticScholar,
                "scopus" => Provider::Scopus,
                "taylor_francis" => Provider::TaylorFrancis,
                _ => Provider::Default,
            }
        }
    }

    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Xai => "xai",
            Provider::SemanticScholar => "semantic_scholar",
            Provider::Scopus => "scopus",
            Provider::TaylorFrancis => "taylor_francis",
            Provider::Default => "default",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
