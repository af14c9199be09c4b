//! Result types returned by the search pipeline.

use serde::{Deserialize, Serialize};

/// A cited reference attached to a synthesized answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

impl Source {
    /// Source discovered by URL scanning, with no title or snippet.
    pub fn bare(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            snippet: String::new(),
        }
    }
}

/// Token accounting reported by the remote API, when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// The pipeline's return value. Exactly one of two shapes holds: `ok: true`
/// with recovered content, or `ok: false` with a non-empty `error`. The
/// pipeline never surfaces failures any other way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub ok: bool,
    /// Synthesized answer text; empty on failure.
    pub content: String,
    /// Cited sources, deduplicated by URL in discovery order.
    pub sources: Vec<Source>,
    /// Original unparsed assistant text, populated only when structured
    /// parsing failed but text was recovered. Also carries truncated error
    /// bodies on failure.
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub elapsed_ms: u64,
    pub retries: u32,
}

impl SearchResult {
    /// Failure shape: `ok` false, non-empty `error`, empty content.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            content: String::new(),
            sources: Vec::new(),
            raw: String::new(),
            error: Some(error.into()),
            model: None,
            usage: None,
            elapsed_ms: 0,
            retries: 0,
        }
    }

    /// Attach a truncated raw body for diagnostics.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Stamp wall time and retry count before handing the result back.
    pub fn with_timing(mut self, elapsed_ms: u64, retries: u32) -> Self {
        self.elapsed_ms = elapsed_ms;
        self.retries = retries;
        self
    }
}
