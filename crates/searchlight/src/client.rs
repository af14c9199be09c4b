//! The retrying request executor.
//!
//! Owns the request lifecycle: validates configuration, dispatches attempts
//! over a shared or transient HTTP client, classifies failures, and drives
//! the retry state machine. Every outcome surfaces as a [`SearchResult`];
//! this boundary never returns an error.

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{normalize_api_key, normalize_endpoint};
use crate::decode::{self, CanonicalMessage, truncate_raw};
use crate::extract;
use crate::request::{SearchOptions, build_body, build_headers};
use crate::retry::{AttemptDisposition, RetryState};
use crate::types::SearchResult;

/// Outcome of one HTTP attempt, classified for the retry policy.
enum AttemptOutcome {
    Delivered(CanonicalMessage),
    Failed {
        error: String,
        raw: String,
        retryable: bool,
    },
}

/// Submit a query to an OpenAI-compatible chat-completions endpoint
/// configured for live web search.
///
/// Retries transport failures and retryable upstream statuses per
/// `opts.retry`, sleeping the linear backoff between attempts. Attempts are
/// strictly sequential; the configured timeout bounds each attempt, not the
/// whole call. When `opts.http_client` is set it is reused and never closed;
/// otherwise each attempt uses a transient client scoped to itself.
pub async fn search(
    query: &str,
    endpoint: &str,
    api_key: &str,
    opts: &SearchOptions,
) -> SearchResult {
    let started = Instant::now();

    let endpoint = normalize_endpoint(endpoint);
    let api_key = normalize_api_key(api_key);

    // Configuration failures are never retried and touch no network.
    if endpoint.is_empty() {
        return SearchResult::failure(
            "missing endpoint configuration: set the API base URL for the search provider",
        )
        .with_timing(elapsed_ms(&started), 0);
    }
    if api_key.is_empty() {
        return SearchResult::failure("missing api_key configuration: set the API key")
            .with_timing(elapsed_ms(&started), 0);
    }

    let url = format!("{endpoint}/v1/chat/completions");
    let body = build_body(query, opts);
    let headers = build_headers(&api_key, opts);

    let mut delivered: Option<CanonicalMessage> = None;
    let mut last_failure: Option<(String, String)> = None;

    let mut state = RetryState::Attempting { attempt: 0 };
    let retries = loop {
        match state {
            RetryState::Attempting { attempt } => {
                debug!(attempt, url = %url, "dispatching search request");
                match run_attempt(&url, &body, &headers, opts).await {
                    AttemptOutcome::Delivered(message) => {
                        delivered = Some(message);
                        state = opts.retry.next_state(attempt, AttemptDisposition::Success);
                    }
                    AttemptOutcome::Failed {
                        error,
                        raw,
                        retryable,
                    } => {
                        let disposition = if retryable {
                            AttemptDisposition::RetryableFailure
                        } else {
                            AttemptDisposition::FatalFailure
                        };
                        warn!(attempt, retryable, error = %error, "search attempt failed");
                        last_failure = Some((error, raw));
                        state = opts.retry.next_state(attempt, disposition);
                    }
                }
            }
            RetryState::Backoff {
                next_attempt,
                delay,
            } => {
                debug!(next_attempt, ?delay, "backing off before retry");
                tokio::time::sleep(delay).await;
                state = RetryState::Attempting {
                    attempt: next_attempt,
                };
            }
            RetryState::Succeeded { retries } | RetryState::Failed { retries } => break retries,
        }
    };

    match delivered {
        Some(message) => {
            let extraction = extract::extract(&message.content);
            SearchResult {
                ok: true,
                content: extraction.content,
                sources: extraction.sources,
                raw: extraction.raw,
                error: None,
                model: message.model.or_else(|| opts.model.clone()),
                usage: message.usage,
                elapsed_ms: elapsed_ms(&started),
                retries,
            }
        }
        None => {
            let (error, raw) =
                last_failure.unwrap_or_else(|| ("unknown error".to_string(), String::new()));
            SearchResult::failure(error)
                .with_raw(raw)
                .with_timing(elapsed_ms(&started), retries)
        }
    }
}

/// Run a single HTTP attempt and classify its outcome.
async fn run_attempt(
    url: &str,
    body: &Value,
    headers: &[(String, String)],
    opts: &SearchOptions,
) -> AttemptOutcome {
    let transient;
    let client = match opts.http_client.as_ref() {
        Some(shared) => shared,
        None => match reqwest::Client::builder().build() {
            Ok(built) => {
                transient = built;
                &transient
            }
            Err(e) => {
                return AttemptOutcome::Failed {
                    error: format!("failed to build HTTP client: {e}"),
                    raw: String::new(),
                    retryable: false,
                };
            }
        },
    };

    let mut request = client.post(url).timeout(opts.timeout).json(body);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            return AttemptOutcome::Failed {
                error: format!(
                    "request timed out after {:.1}s; check the network or raise timeout_seconds",
                    opts.timeout.as_secs_f64()
                ),
                raw: String::new(),
                retryable: true,
            };
        }
        Err(e) => {
            return AttemptOutcome::Failed {
                error: format!("network request failed: {e}"),
                raw: String::new(),
                retryable: true,
            };
        }
    };

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let raw_text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            return AttemptOutcome::Failed {
                error: format!("failed to read response body: {e}"),
                raw: String::new(),
                retryable: true,
            };
        }
    };

    if status != 200 {
        let error = match status_hint(status) {
            Some(hint) => format!("HTTP {status} - {hint}"),
            None => format!("HTTP {status}"),
        };
        return AttemptOutcome::Failed {
            error,
            raw: truncate_raw(&raw_text),
            retryable: opts.retry.is_retryable_status(status),
        };
    }

    // The remote answered; an undecodable payload is not worth retrying.
    match decode::decode(&raw_text, &content_type) {
        Ok(message) => AttemptOutcome::Delivered(message),
        Err(err) => AttemptOutcome::Failed {
            raw: err.raw().to_string(),
            error: err.to_string(),
            retryable: false,
        },
    }
}

/// Operator-facing explanation for common upstream statuses.
fn status_hint(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("malformed request, check the extra_body configuration"),
        401 => Some("authentication failed, check the API key"),
        403 => Some("access denied, check the API permissions"),
        404 => Some("endpoint not found, check the base URL"),
        429 => Some("rate limited, try again later"),
        500 => Some("upstream internal server error"),
        502 => Some("bad gateway, the API may be temporarily unavailable"),
        503 => Some("service temporarily unavailable, try again later"),
        _ => None,
    }
}

fn elapsed_ms(started: &Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_hints_cover_documented_codes() {
        for status in [400, 401, 403, 404, 429, 500, 502, 503] {
            assert!(status_hint(status).is_some(), "{status}");
        }
        assert!(status_hint(418).is_none());
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails_fast() {
        let result = search("q", "", "sk-test", &SearchOptions::default()).await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("endpoint"));
        assert_eq!(result.retries, 0);
    }

    #[tokio::test]
    async fn test_placeholder_api_key_fails_fast() {
        let result = search(
            "q",
            "https://api.example.com",
            "YOUR_API_KEY",
            &SearchOptions::default(),
        )
        .await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("api_key"));
    }
}
