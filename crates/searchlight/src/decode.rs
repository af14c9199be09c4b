//! Response decoding: one canonical assistant message out of either wire
//! encoding.
//!
//! The remote is asked for `stream: false` but gateways are not trusted to
//! honor that (or to label what they send), so the decoder sniffs for SSE
//! bodies regardless of content-type and merges delta chunks back into a
//! single message.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::types::Usage;

/// Cap on raw diagnostic bodies embedded in results.
pub const MAX_RAW_CHARS: usize = 2000;

/// Truncate a raw body for embedding in a result.
pub(crate) fn truncate_raw(raw: &str) -> String {
    raw.chars().take(MAX_RAW_CHARS).collect()
}

/// The decoder's unified view of "the assistant's reply", irrespective of
/// which wire encoding produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMessage {
    pub content: String,
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// A 200 response whose body could not be decoded into a usable message.
/// Never retried: the remote answered, the payload shape is just unexpected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("event stream contained no parseable events")]
    EmptyStream { raw: String },

    #[error("response is not valid JSON: {detail}")]
    MalformedJson { detail: String, raw: String },

    #[error("API returned an error: {message}")]
    Api { message: String, raw: String },

    #[error("empty response: {detail}")]
    EmptyResponse { detail: String, raw: String },
}

impl DecodeError {
    /// Truncated raw body attached for diagnostics.
    pub fn raw(&self) -> &str {
        match self {
            Self::EmptyStream { raw }
            | Self::MalformedJson { raw, .. }
            | Self::Api { raw, .. }
            | Self::EmptyResponse { raw, .. } => raw,
        }
    }
}

/// Whether a body should be decoded as an SSE event stream. The content-type
/// header wins when present, but a body whose leading non-whitespace is a
/// `data:` line is treated as a stream even when mislabeled.
pub fn is_event_stream(content_type: &str, body: &str) -> bool {
    content_type.contains("text/event-stream") || body.trim_start().starts_with("data:")
}

/// Decode raw response text into a canonical message.
pub fn decode(body: &str, content_type: &str) -> Result<CanonicalMessage, DecodeError> {
    if is_event_stream(content_type, body) {
        debug!("decoding response as event stream");
        decode_event_stream(body)
    } else {
        debug!("decoding response as plain JSON");
        decode_json(body)
    }
}

/// Merge an SSE body's delta chunks into one message. Lines that are blank,
/// comments, the `[DONE]` terminator, or unparseable JSON are skipped; a
/// stream yielding zero parseable events is an error.
fn decode_event_stream(body: &str) -> Result<CanonicalMessage, DecodeError> {
    let mut content = String::new();
    let mut model: Option<String> = None;
    let mut usage: Option<Usage> = None;
    let mut parsed_any = false;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            continue;
        }
        let Ok(chunk) = serde_json::from_str::<Value>(data) else {
            continue;
        };
        if !chunk.is_object() {
            continue;
        }
        parsed_any = true;

        if model.is_none() {
            model = chunk
                .get("model")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
        }
        if let Some(u) = parse_usage(chunk.get("usage")) {
            usage = Some(u);
        }
        if let Some(fragment) = chunk
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
        {
            content.push_str(fragment);
        }
    }

    if !parsed_any {
        return Err(DecodeError::EmptyStream {
            raw: truncate_raw(body),
        });
    }
    if content.is_empty() {
        return Err(DecodeError::EmptyResponse {
            detail: "choices[0].delta.content produced no text".to_string(),
            raw: truncate_raw(body),
        });
    }

    Ok(CanonicalMessage {
        content,
        model,
        usage,
    })
}

/// Parse the whole body as one JSON object and validate its shape.
fn decode_json(body: &str) -> Result<CanonicalMessage, DecodeError> {
    let data: Value = serde_json::from_str(body.trim()).map_err(|e| DecodeError::MalformedJson {
        detail: e.to_string(),
        raw: truncate_raw(body),
    })?;

    if let Some(message) = api_error_message(data.get("error")) {
        return Err(DecodeError::Api {
            message,
            raw: truncate_raw(body),
        });
    }

    let choices = match data.get("choices") {
        Some(Value::Array(choices)) if !choices.is_empty() => choices,
        Some(Value::Array(_)) => {
            return Err(DecodeError::EmptyResponse {
                detail: "choices array is empty".to_string(),
                raw: truncate_raw(body),
            });
        }
        Some(_) => {
            return Err(DecodeError::EmptyResponse {
                detail: "choices is not an array".to_string(),
                raw: truncate_raw(body),
            });
        }
        None => {
            return Err(DecodeError::EmptyResponse {
                detail: "response is missing the choices field".to_string(),
                raw: truncate_raw(body),
            });
        }
    };

    let content = choices[0]
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");
    if content.is_empty() {
        return Err(DecodeError::EmptyResponse {
            detail: "choices[0].message.content is empty".to_string(),
            raw: truncate_raw(body),
        });
    }

    Ok(CanonicalMessage {
        content: content.to_string(),
        model: data
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        usage: parse_usage(data.get("usage")),
    })
}

/// Extract a human-readable message from a top-level `error` field. Only
/// objects and strings count; other shapes fall through to normal decoding.
fn api_error_message(error: Option<&Value>) -> Option<String> {
    match error? {
        Value::Object(map) => Some(
            map.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        ),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn parse_usage(value: Option<&Value>) -> Option<Usage> {
    let value = value?;
    let map = value.as_object()?;
    if map.is_empty() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniffs_sse_without_content_type() {
        assert!(is_event_stream("", "data: {}\n\n"));
        assert!(is_event_stream("", "  \n data: {}"));
        assert!(is_event_stream("text/event-stream; charset=utf-8", "{}"));
        assert!(!is_event_stream("application/json", "{\"a\":1}"));
    }

    #[test]
    fn test_decode_plain_json() {
        let body = r#"{
            "model": "search-pro",
            "choices": [{"message": {"content": "Hello"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let message = decode(body, "application/json").unwrap();
        assert_eq!(message.content, "Hello");
        assert_eq!(message.model.as_deref(), Some("search-pro"));
        assert_eq!(message.usage.unwrap().total_tokens, Some(15));
    }

    #[test]
    fn test_decode_event_stream_merges_deltas() {
        let body = concat!(
            ": keepalive\n",
            "\n",
            "data: {\"model\":\"search-pro\",\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n",
            "data: not json, skipped\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}],\"usage\":{\"total_tokens\":7}}\n",
            "data: [DONE]\n",
        );

        let message = decode(body, "text/event-stream").unwrap();
        assert_eq!(message.content, "Hello world");
        assert_eq!(message.model.as_deref(), Some("search-pro"));
        assert_eq!(message.usage.unwrap().total_tokens, Some(7));
    }

    #[test]
    fn test_decoder_equivalence_across_encodings() {
        let text = "The answer is 42.";
        let json_body = serde_json::json!({
            "choices": [{"message": {"content": text}}]
        })
        .to_string();
        let sse_body = format!(
            "data: {}\n\ndata: {}\n\ndata: [DONE]\n",
            serde_json::json!({"choices": [{"delta": {"content": "The answer"}}]}),
            serde_json::json!({"choices": [{"delta": {"content": " is 42."}}]}),
        );

        let from_json = decode(&json_body, "application/json").unwrap();
        let from_sse = decode(&sse_body, "text/event-stream").unwrap();
        assert_eq!(from_json.content, from_sse.content);
        assert_eq!(from_json.content, text);
    }

    #[test]
    fn test_empty_stream_is_an_error() {
        let err = decode("data: [DONE]\n", "text/event-stream").unwrap_err();
        assert!(matches!(err, DecodeError::EmptyStream { .. }));

        let err = decode(": only comments\n\n", "text/event-stream").unwrap_err();
        assert!(matches!(err, DecodeError::EmptyStream { .. }));
    }

    #[test]
    fn test_malformed_json_keeps_truncated_raw() {
        let body = "x".repeat(5000);
        let err = decode(&body, "application/json").unwrap_err();
        match err {
            DecodeError::MalformedJson { raw, .. } => assert_eq!(raw.chars().count(), MAX_RAW_CHARS),
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn test_api_error_object_and_string() {
        let body = r#"{"error": {"message": "model overloaded", "code": 42}}"#;
        let err = decode(body, "application/json").unwrap_err();
        match err {
            DecodeError::Api { message, .. } => assert_eq!(message, "model overloaded"),
            other => panic!("expected Api, got {other:?}"),
        }

        let body = r#"{"error": "quota exceeded"}"#;
        let err = decode(body, "application/json").unwrap_err();
        match err {
            DecodeError::Api { message, .. } => assert_eq!(message, "quota exceeded"),
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_choices_variants_name_the_field() {
        let cases = [
            (r#"{"id": "x"}"#, "missing the choices"),
            (r#"{"choices": {}}"#, "not an array"),
            (r#"{"choices": []}"#, "array is empty"),
            (r#"{"choices": [{"message": {"content": ""}}]}"#, "content is empty"),
        ];
        for (body, expected) in cases {
            let err = decode(body, "application/json").unwrap_err();
            match err {
                DecodeError::EmptyResponse { detail, .. } => {
                    assert!(detail.contains(expected), "{detail} missing {expected}")
                }
                other => panic!("expected EmptyResponse for {body}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_usage_object_is_dropped() {
        let body = r#"{"choices": [{"message": {"content": "hi"}}], "usage": {}}"#;
        let message = decode(body, "application/json").unwrap();
        assert!(message.usage.is_none());
    }
}
