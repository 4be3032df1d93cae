//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `fetch`: Resolve a barcode list into a JSON report
//! - `keys`: Report which API credentials are configured
//! - `cache`: Inspect or clear the product cache

mod cache;
mod fetch;
mod keys;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Runtime;

use crate::config::{self, Config, Credentials};

pub use cache::{cmd_cache_clear, cmd_cache_stats};
pub use fetch::cmd_fetch;
pub use keys::cmd_check_keys;

/// Barcode Resolver CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: <config dir>/barcode-resolver/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve every barcode in a file and write a JSON report
    Fetch {
        /// Text or CSV file, one `barcode[,name]` per line
        input: PathBuf,
        /// Where to write the JSON report
        #[arg(short, long, default_value = "output/barcode_products.json")]
        output: PathBuf,
        /// Discard saved progress and start over
        #[arg(long)]
        reset_checkpoint: bool,
        /// Barcodes to resolve at once
        #[arg(short, long)]
        concurrency: Option<usize>,
        #[command(flatten)]
        credentials: CredentialArgs,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Show which API credentials are configured
    CheckKeys {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Inspect or clear the product cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show entry count and size
    Stats,
    /// Delete every cached product
    Clear,
}

/// API credentials, each also read from its environment variable
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,
    #[arg(long, env = "GOOGLE_SEARCH_CX", hide_env_values = true)]
    pub google_search_cx: Option<String>,
    #[arg(long, env = "DIGITEYES_APP_KEY", hide_env_values = true)]
    pub digiteyes_app_key: Option<String>,
    #[arg(long, env = "DIGITEYES_SIGNATURE", hide_env_values = true)]
    pub digiteyes_signature: Option<String>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub deepseek_api_key: Option<String>,
}

impl CredentialArgs {
    fn to_credentials(&self) -> Credentials {
        Credentials {
            google_api_key: self.google_api_key.clone(),
            google_search_cx: self.google_search_cx.clone(),
            digiteyes_app_key: self.digiteyes_app_key.clone(),
            digiteyes_signature: self.digiteyes_signature.clone(),
            gemini_api_key: self.gemini_api_key.clone(),
            openai_api_key: self.openai_api_key.clone(),
            deepseek_api_key: self.deepseek_api_key.clone(),
        }
    }
}

/// Overrides for the `[retry]` and `[endpoints]` config sections
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Retries per data source call
    #[arg(long, env = "MAX_RETRIES")]
    pub max_retries: Option<u32>,
    /// Seconds between calls to the same service
    #[arg(long, env = "API_REQUEST_DELAY")]
    pub request_delay: Option<f64>,
    /// Open Food Facts product API base URL
    #[arg(long, env = "OPENFOODFACTS_URL")]
    pub openfoodfacts_url: Option<String>,
}

impl TuningArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(retries) = self.max_retries {
            config.retry.max_retries = retries;
        }
        // Negative, non-finite and out-of-range delays are ignored
        if let Some(delay) = self.request_delay.and_then(|d| Duration::try_from_secs_f64(d).ok()) {
            config.retry.min_interval_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(url) = self.openfoodfacts_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            config.endpoints.open_food_facts = Some(url.to_string());
        }
    }
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was specified.
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let config_path = cli.config.as_deref();

    match &cli.command {
        Some(Commands::Fetch {
            input,
            output,
            reset_checkpoint,
            concurrency,
            credentials,
            tuning,
        }) => {
            let rt = Runtime::new()?;
            let mut config = load_config(config_path, credentials)?;
            tuning.apply(&mut config);
            if let Some(concurrency) = concurrency {
                config.batch.concurrency = *concurrency;
            }
            cmd_fetch(&rt, &config, input, output, *reset_checkpoint)?;
            Ok(true)
        }
        Some(Commands::CheckKeys { credentials }) => {
            let config = load_config(config_path, credentials)?;
            cmd_check_keys(&config)?;
            Ok(true)
        }
        Some(Commands::Cache { action }) => {
            let config = config::load(config_path)?;
            match action {
                CacheAction::Stats => cmd_cache_stats(&config)?,
                CacheAction::Clear => cmd_cache_clear(&config)?,
            }
            Ok(true)
        }
        None => Ok(false),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Load the config file, then layer credentials from flags and environment on top.
fn load_config(path: Option<&Path>, credentials: &CredentialArgs) -> anyhow::Result<Config> {
    let mut config = config::load(path)?;
    config.credentials.override_with(credentials.to_credentials());
    Ok(config)
}

/// Human-readable byte count
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
