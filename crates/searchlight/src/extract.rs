//! Content extraction: structured results out of whatever the model sent.
//!
//! The system prompt asks for a single JSON object with `content` and
//! `sources` keys, but the model is free to ignore that. Free text is still
//! recovered as a best-effort answer with URL-scanned sources.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::types::Source;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)\]}>"']+"#).expect("url regex must compile"));

/// Outcome of interpreting the assistant's text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Synthesized answer text.
    pub content: String,
    /// Cited sources, deduplicated by URL in discovery order.
    pub sources: Vec<Source>,
    /// The original text, populated only when it was not structured JSON.
    pub raw: String,
}

/// Interpret assistant text as a structured result when possible, falling
/// back to treating the whole text as the answer.
pub fn extract(assistant_text: &str) -> Extraction {
    match coerce_json_object(assistant_text) {
        Some(parsed) => {
            let content = string_field(parsed.get("content"));
            let mut sources = structured_sources(parsed.get("sources"));
            if sources.is_empty() {
                // Deliberate policy: an empty or malformed sources array
                // falls back to scanning the answer text for literal URLs.
                sources = scan_sources(&content);
            }
            Extraction {
                content,
                sources,
                raw: String::new(),
            }
        }
        None => Extraction {
            content: assistant_text.to_string(),
            sources: scan_sources(assistant_text),
            raw: assistant_text.to_string(),
        },
    }
}

/// Parse text as a JSON object only when it looks like one. The brace
/// pre-check avoids parse attempts on prose that merely contains braces.
pub fn coerce_json_object(text: &str) -> Option<Map<String, Value>> {
    let text = text.trim();
    if text.is_empty() || !text.starts_with('{') || !text.ends_with('}') {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Scan text for literal URLs, stripping trailing sentence punctuation and
/// deduplicating in first-seen order.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for found in URL_RE.find_iter(text) {
        let url = found
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"']);
        if !url.is_empty() && seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }
    urls
}

fn scan_sources(text: &str) -> Vec<Source> {
    extract_urls(text).into_iter().map(Source::bare).collect()
}

/// Coerce a JSON field to a string, treating null/absent as empty.
fn string_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Keep only sources that are objects with a non-empty `url`.
fn structured_sources(value: Option<&Value>) -> Vec<Source> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let url = obj.get("url").and_then(Value::as_str)?;
            if url.is_empty() {
                return None;
            }
            Some(Source {
                url: url.to_string(),
                title: string_field(obj.get("title")),
                snippet: string_field(obj.get("snippet")),
            })
        })
        .collect()
}
