//! Searchlight CLI - web research via an OpenAI-compatible endpoint.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use searchlight_cli::error::CliResult;
use searchlight_cli::output::{self, OutputFormat};
use searchlight_cli::settings::{
    ENV_CONFIG_PATH, EnvOverrides, FileConfig, FlagOverrides, Settings, default_config_path,
};

/// Web research via an OpenAI-compatible search endpoint
#[derive(Parser)]
#[command(name = "searchlight")]
#[command(about = "Web research via an OpenAI-compatible search endpoint")]
#[command(version)]
pub struct Cli {
    /// Search query / research task
    pub query: String,

    /// Override the API base URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override the API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Override the model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    pub timeout_seconds: Option<f64>,

    /// Path to config file (default: ~/.searchlight/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Enable thinking mode (the default)
    #[arg(long, overrides_with = "no_thinking")]
    pub thinking: bool,

    /// Disable thinking mode
    #[arg(long, overrides_with = "thinking")]
    pub no_thinking: bool,

    /// Thinking token budget
    #[arg(long)]
    pub thinking_budget: Option<u32>,

    /// Extra JSON object merged into the request body
    #[arg(long)]
    pub extra_body_json: Option<String>,

    /// Extra JSON object merged into the request headers
    #[arg(long)]
    pub extra_headers_json: Option<String>,

    /// Maximum retry attempts after the first
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base retry delay in seconds (linear backoff)
    #[arg(long)]
    pub retry_delay_seconds: Option<f64>,

    /// Output the full result as JSON
    #[arg(long, short = 'j')]
    pub json: bool,

    /// List cited sources under the answer
    #[arg(long)]
    pub show_sources: bool,

    /// Cap on listed sources (0 = unlimited)
    #[arg(long)]
    pub max_sources: Option<usize>,
}

#[tokio::main]
async fn main() {
    init_logging();
    std::process::exit(run().await);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,searchlight=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> i32 {
    let cli = Cli::parse();

    let settings = match resolve_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };

    if settings.endpoint.is_empty() || settings.api_key.is_empty() {
        eprintln!(
            "Error: missing endpoint or API key; pass --endpoint/--api-key, set \
             SEARCHLIGHT_ENDPOINT/SEARCHLIGHT_API_KEY, or write them to {}",
            cli.config
                .clone()
                .unwrap_or_else(default_config_path)
                .display()
        );
        return 2;
    }

    let opts = settings.search_options();
    let result = searchlight::search(&cli.query, &settings.endpoint, &settings.api_key, &opts).await;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    println!(
        "{}",
        output::render(&result, format, settings.show_sources, settings.max_sources)
    );

    if result.ok { 0 } else { 1 }
}

fn resolve_settings(cli: &Cli) -> CliResult<Settings> {
    let flags = FlagOverrides {
        endpoint: cli.endpoint.clone(),
        api_key: cli.api_key.clone(),
        model: cli.model.clone(),
        timeout_seconds: cli.timeout_seconds,
        enable_thinking: if cli.thinking {
            Some(true)
        } else if cli.no_thinking {
            Some(false)
        } else {
            None
        },
        thinking_budget: cli.thinking_budget,
        extra_body_json: cli.extra_body_json.clone(),
        extra_headers_json: cli.extra_headers_json.clone(),
        max_retries: cli.max_retries,
        retry_delay_seconds: cli.retry_delay_seconds,
        show_sources: cli.show_sources,
        max_sources: cli.max_sources,
    };

    // An explicitly named config file must exist; the default one is optional.
    let env_config_path = std::env::var(ENV_CONFIG_PATH)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let file = match cli.config.clone().or(env_config_path) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            FileConfig::load(&path)?
        }
        None => {
            let path = default_config_path();
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading default config file");
                FileConfig::load(&path)?
            } else {
                FileConfig::default()
            }
        }
    };

    Settings::resolve(&flags, &EnvOverrides::from_process_env(), &file)
}
