//! Searchlight - resilient web search over OpenAI-compatible endpoints
//!
//! This crate submits natural-language queries to a remote chat-completions
//! endpoint configured for live web search and returns a normalized result:
//! a synthesized answer plus cited sources. It tolerates both plain-JSON and
//! SSE response encodings, retries transient failures with bounded linear
//! backoff, and degrades gracefully when the model ignores the requested
//! output schema.

pub mod client;
pub mod config;
pub mod decode;
pub mod extract;
pub mod request;
pub mod retry;
pub mod types;

pub use client::search;
pub use request::SearchOptions;
pub use retry::RetryPolicy;
pub use types::{SearchResult, Source, Usage};
