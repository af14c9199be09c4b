//! Layered settings resolution: flags > environment > config file > defaults.
//!
//! Resolution is pure over its inputs; the process environment is snapshotted
//! once into [`EnvOverrides`] so tests never mutate global state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use searchlight::{RetryPolicy, SearchOptions};

use crate::error::{CliError, CliResult};

/// Upper bounds on user-supplied durations. `Duration::from_secs_f64` panics
/// on values it cannot represent, so anything non-finite or absurd is a usage
/// error instead.
pub const MAX_TIMEOUT_SECONDS: f64 = 86_400.0;
pub const MAX_RETRY_DELAY_SECONDS: f64 = 600.0;

pub const ENV_CONFIG_PATH: &str = "SEARCHLIGHT_CONFIG_PATH";
pub const ENV_ENDPOINT: &str = "SEARCHLIGHT_ENDPOINT";
pub const ENV_API_KEY: &str = "SEARCHLIGHT_API_KEY";
pub const ENV_MODEL: &str = "SEARCHLIGHT_MODEL";
pub const ENV_TIMEOUT_SECONDS: &str = "SEARCHLIGHT_TIMEOUT_SECONDS";
pub const ENV_ENABLE_THINKING: &str = "SEARCHLIGHT_ENABLE_THINKING";
pub const ENV_THINKING_BUDGET: &str = "SEARCHLIGHT_THINKING_BUDGET";
pub const ENV_EXTRA_BODY_JSON: &str = "SEARCHLIGHT_EXTRA_BODY_JSON";
pub const ENV_EXTRA_HEADERS_JSON: &str = "SEARCHLIGHT_EXTRA_HEADERS_JSON";

/// Optional overrides taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct FlagOverrides {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<f64>,
    pub enable_thinking: Option<bool>,
    pub thinking_budget: Option<u32>,
    pub extra_body_json: Option<String>,
    pub extra_headers_json: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_delay_seconds: Option<f64>,
    pub show_sources: bool,
    pub max_sources: Option<usize>,
}

/// Snapshot of the relevant environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<String>,
    pub enable_thinking: Option<String>,
    pub thinking_budget: Option<String>,
    pub extra_body_json: Option<String>,
    pub extra_headers_json: Option<String>,
}

impl EnvOverrides {
    pub fn from_process_env() -> Self {
        let get = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            endpoint: get(ENV_ENDPOINT),
            api_key: get(ENV_API_KEY),
            model: get(ENV_MODEL),
            timeout_seconds: get(ENV_TIMEOUT_SECONDS),
            enable_thinking: get(ENV_ENABLE_THINKING),
            thinking_budget: get(ENV_THINKING_BUDGET),
            extra_body_json: get(ENV_EXTRA_BODY_JSON),
            extra_headers_json: get(ENV_EXTRA_HEADERS_JSON),
        }
    }
}

/// Config file model (TOML).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<f64>,
    pub enable_thinking: Option<bool>,
    pub thinking_budget: Option<u32>,
    pub max_retries: Option<u32>,
    pub retry_delay_seconds: Option<f64>,
    pub retryable_status_codes: Option<Vec<u16>>,
    pub show_sources: Option<bool>,
    pub max_sources: Option<usize>,
    #[serde(default)]
    pub extra_body: Map<String, Value>,
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl FileConfig {
    pub fn load(path: &std::path::Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError(format!("cannot read config {}: {e}", path.display())))?;
        Ok(toml::from_str(&text)?)
    }
}

/// Default config location: `~/.searchlight/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".searchlight"))
        .unwrap_or_else(|| PathBuf::from(".searchlight"))
        .join("config.toml")
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: String,
    pub model: Option<String>,
    pub timeout_seconds: f64,
    pub enable_thinking: bool,
    pub thinking_budget: u32,
    pub max_retries: u32,
    pub retry_delay_seconds: f64,
    pub retryable_status_codes: Option<Vec<u16>>,
    pub extra_body: Map<String, Value>,
    pub extra_headers: HashMap<String, String>,
    pub show_sources: bool,
    pub max_sources: usize,
}

impl Settings {
    /// Resolve each setting with precedence flag > env > file > default.
    pub fn resolve(flags: &FlagOverrides, env: &EnvOverrides, file: &FileConfig) -> CliResult<Self> {
        let endpoint = pick_string(&flags.endpoint, &env.endpoint, &file.endpoint);
        let api_key = pick_string(&flags.api_key, &env.api_key, &file.api_key);
        let model = {
            let m = pick_string(&flags.model, &env.model, &file.model);
            (!m.is_empty()).then_some(m)
        };

        let timeout_seconds = flags
            .timeout_seconds
            .or_else(|| env.timeout_seconds.as_deref().and_then(|v| v.parse().ok()))
            .or(file.timeout_seconds)
            .filter(|t| *t > 0.0)
            .unwrap_or(60.0);
        if !timeout_seconds.is_finite() || timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(CliError(format!(
                "timeout_seconds must be a finite number of seconds no greater than {MAX_TIMEOUT_SECONDS}"
            )));
        }

        let retry_delay_seconds = flags
            .retry_delay_seconds
            .or(file.retry_delay_seconds)
            .filter(|d| *d >= 0.0)
            .unwrap_or(1.0);
        if !retry_delay_seconds.is_finite() || retry_delay_seconds > MAX_RETRY_DELAY_SECONDS {
            return Err(CliError(format!(
                "retry_delay_seconds must be a finite number of seconds no greater than {MAX_RETRY_DELAY_SECONDS}"
            )));
        }

        let enable_thinking = flags
            .enable_thinking
            .or_else(|| env.enable_thinking.as_deref().and_then(parse_bool))
            .or(file.enable_thinking)
            .unwrap_or(true);

        let thinking_budget = flags
            .thinking_budget
            .or_else(|| env.thinking_budget.as_deref().and_then(|v| v.parse().ok()))
            .or(file.thinking_budget)
            .unwrap_or(32_000);

        // Extra fields merge file < env < flag, later layers winning per key.
        let mut extra_body = file.extra_body.clone();
        for layer in [&env.extra_body_json, &flags.extra_body_json] {
            if let Some(raw) = layer {
                extra_body.extend(parse_json_object(raw, "extra body")?);
            }
        }
        let mut extra_headers = file.extra_headers.clone();
        for layer in [&env.extra_headers_json, &flags.extra_headers_json] {
            if let Some(raw) = layer {
                for (key, value) in parse_json_object(raw, "extra headers")? {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    extra_headers.insert(key, value);
                }
            }
        }

        Ok(Self {
            endpoint,
            api_key,
            model,
            timeout_seconds,
            enable_thinking,
            thinking_budget,
            max_retries: flags.max_retries.or(file.max_retries).unwrap_or(3),
            retry_delay_seconds,
            retryable_status_codes: file.retryable_status_codes.clone(),
            extra_body,
            extra_headers,
            show_sources: flags.show_sources || file.show_sources.unwrap_or(false),
            max_sources: flags.max_sources.or(file.max_sources).unwrap_or(5),
        })
    }

    /// Convert into the library's per-call options.
    pub fn search_options(&self) -> SearchOptions {
        let mut retry = RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_secs_f64(self.retry_delay_seconds),
            ..RetryPolicy::default()
        };
        if let Some(codes) = &self.retryable_status_codes {
            retry.retryable_statuses = codes.iter().copied().collect();
        }

        SearchOptions {
            model: self.model.clone(),
            timeout: Duration::from_secs_f64(self.timeout_seconds),
            enable_thinking: self.enable_thinking,
            thinking_budget: self.thinking_budget,
            extra_body: self.extra_body.clone(),
            extra_headers: self.extra_headers.clone(),
            retry,
            ..SearchOptions::default()
        }
    }
}

fn pick_string(flag: &Option<String>, env: &Option<String>, file: &Option<String>) -> String {
    [flag, env, file]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_string()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a JSON string that must be an object; empty input is an empty map.
pub fn parse_json_object(raw: &str, label: &str) -> CliResult<Map<String, Value>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError(format!("{label} must be a JSON object"))),
        Err(e) => Err(CliError(format!("invalid {label} JSON: {e}"))),
    }
}
