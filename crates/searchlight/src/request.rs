//! Request construction: body, headers, and per-call options.
//!
//! Caller-supplied extra body/header fields are merged last but can never
//! overwrite the identity fields the pipeline computes itself.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::config::DEFAULT_SYSTEM_PROMPT;
use crate::retry::RetryPolicy;

/// Body keys owned by the pipeline; extra_body entries with these keys are
/// silently dropped.
pub const PROTECTED_BODY_KEYS: &[&str] = &["model", "messages", "stream"];

/// Header names owned by the pipeline, compared case-insensitively.
pub const PROTECTED_HEADERS: &[&str] = &["authorization", "content-type"];

/// Per-call options for [`crate::search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Model identifier; omitted from the body when `None` so the remote
    /// picks its default.
    pub model: Option<String>,
    /// Bounds each individual attempt, not the whole retrying call.
    pub timeout: Duration,
    pub enable_thinking: bool,
    /// Token budget added alongside the reasoning directive when positive.
    pub thinking_budget: u32,
    pub extra_body: Map<String, Value>,
    pub extra_headers: HashMap<String, String>,
    /// Overrides [`DEFAULT_SYSTEM_PROMPT`] when set.
    pub system_prompt: Option<String>,
    pub retry: RetryPolicy,
    /// Shared HTTP client reused across calls. When `None`, each attempt
    /// builds a transient client scoped to itself.
    pub http_client: Option<reqwest::Client>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            model: None,
            timeout: Duration::from_secs(60),
            enable_thinking: true,
            thinking_budget: 32_000,
            extra_body: Map::new(),
            extra_headers: HashMap::new(),
            system_prompt: None,
            retry: RetryPolicy::default(),
            http_client: None,
        }
    }
}

/// Build the chat-completions request body.
pub fn build_body(query: &str, opts: &SearchOptions) -> Value {
    let system_prompt = opts.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let mut body = Map::new();
    body.insert(
        "messages".to_string(),
        json!([
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": query},
        ]),
    );
    body.insert("temperature".to_string(), json!(0.2));
    body.insert("stream".to_string(), json!(false));

    if let Some(model) = opts.model.as_deref().filter(|m| !m.is_empty()) {
        body.insert("model".to_string(), json!(model));
    }

    if opts.enable_thinking {
        body.insert("reasoning_effort".to_string(), json!("high"));
        if opts.thinking_budget > 0 {
            body.insert(
                "reasoning_budget_tokens".to_string(),
                json!(opts.thinking_budget),
            );
        }
    }

    for (key, value) in &opts.extra_body {
        if !PROTECTED_BODY_KEYS.contains(&key.as_str()) {
            body.insert(key.clone(), value.clone());
        }
    }

    Value::Object(body)
}

/// Build the outbound headers, merging caller extras around the protected
/// `Authorization` and `Content-Type` pair.
pub fn build_headers(api_key: &str, opts: &SearchOptions) -> Vec<(String, String)> {
    let mut headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), format!("Bearer {api_key}")),
    ];

    for (key, value) in &opts.extra_headers {
        if !PROTECTED_HEADERS.contains(&key.to_lowercase().as_str()) {
            headers.push((key.clone(), value.clone()));
        }
    }

    headers
}
