//! Configuration system using TOML files.
//!
//! Config is read from the OS-standard config directory unless a path is
//! given explicitly:
//! - Windows: %APPDATA%\barcode-resolver\config.toml
//! - macOS: ~/Library/Application Support/barcode-resolver/config.toml
//! - Linux: ~/.config/barcode-resolver/config.toml
//!
//! Every section is optional and falls back to defaults. Credentials may also
//! come from CLI flags / environment variables; the CLI merges those in before
//! the batch starts, so nothing below the CLI reads the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{Pacer, RetryPolicy};
use crate::sources::prefix::PrefixRule;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials
    pub credentials: Credentials,

    /// Which data sources to query
    pub sources: SourcesConfig,

    /// Retry and pacing for remote calls
    pub retry: RetryConfig,

    /// AI enhancement settings
    pub enhancers: EnhancerConfig,

    /// Cache and checkpoint locations
    pub storage: StorageConfig,

    /// Batch execution settings
    pub batch: BatchConfig,

    /// Base URL overrides (mostly for testing against local servers)
    pub endpoints: Endpoints,

    /// Extra barcode-prefix classification rules, checked with the built-in table
    pub prefix_rules: Vec<PrefixRule>,
}

/// API credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    /// Programmable Search Engine ID
    pub google_search_cx: Option<String>,
    pub digiteyes_app_key: Option<String>,
    pub digiteyes_signature: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
}

impl Credentials {
    /// Google Custom Search needs both a key and a search engine ID.
    pub fn google(&self) -> Option<(&str, &str)> {
        Some((
            present(&self.google_api_key)?,
            present(&self.google_search_cx)?,
        ))
    }

    pub fn digiteyes(&self) -> Option<(&str, &str)> {
        Some((
            present(&self.digiteyes_app_key)?,
            present(&self.digiteyes_signature)?,
        ))
    }

    pub fn gemini(&self) -> Option<&str> {
        present(&self.gemini_api_key)
    }

    pub fn openai(&self) -> Option<&str> {
        present(&self.openai_api_key)
    }

    pub fn deepseek(&self) -> Option<&str> {
        present(&self.deepseek_api_key)
    }

    /// Replace fields with any values set in `other`.
    pub fn override_with(&mut self, other: Credentials) {
        let Credentials {
            google_api_key,
            google_search_cx,
            digiteyes_app_key,
            digiteyes_signature,
            gemini_api_key,
            openai_api_key,
            deepseek_api_key,
        } = other;

        replace_if_set(&mut self.google_api_key, google_api_key);
        replace_if_set(&mut self.google_search_cx, google_search_cx);
        replace_if_set(&mut self.digiteyes_app_key, digiteyes_app_key);
        replace_if_set(&mut self.digiteyes_signature, digiteyes_signature);
        replace_if_set(&mut self.gemini_api_key, gemini_api_key);
        replace_if_set(&mut self.openai_api_key, openai_api_key);
        replace_if_set(&mut self.deepseek_api_key, deepseek_api_key);
    }

    /// Presence of each credential, in service order. Never exposes values.
    pub fn report(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("Google Custom Search", self.google().is_some()),
            ("Digit-Eyes", self.digiteyes().is_some()),
            ("Gemini", self.gemini().is_some()),
            ("OpenAI", self.openai().is_some()),
            ("DeepSeek", self.deepseek().is_some()),
        ]
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn replace_if_set(slot: &mut Option<String>, value: Option<String>) {
    if value.as_deref().is_some_and(|v| !v.trim().is_empty()) {
        *slot = value;
    }
}

/// Data source toggles. A source without credentials is skipped regardless.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub open_food_facts: bool,
    pub google: bool,
    pub digiteyes: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            open_food_facts: true,
            google: true,
            digiteyes: true,
        }
    }
}

/// Retry and pacing for data source calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry, doubled for each further one
    pub base_delay_ms: u64,

    /// Randomize delays by up to ±20%
    pub jitter: bool,

    /// Minimum time between two calls to the same service
    pub min_interval_ms: u64,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1000,
            jitter: true,
            min_interval_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

impl RetryConfig {
    /// Policy for data source calls
    pub fn policy(&self) -> RetryPolicy {
        self.policy_with_budget(self.max_retries)
    }

    /// Same delays and jitter, different retry budget
    pub fn policy_with_budget(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(self.base_delay_ms))
            .with_jitter(self.jitter)
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(Duration::from_millis(self.min_interval_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// AI enhancement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    /// Run the enhancer chain at all
    pub enabled: bool,

    /// Retries per AI call (smaller than the source budget)
    pub max_retries: u32,

    /// Consecutive failed barcodes before a service is disabled for the run
    pub failure_threshold: u32,

    /// Append the offline keyword formatter as the last link
    pub local_fallback: bool,

    pub gemini_model: String,
    pub openai_model: String,
    pub deepseek_model: String,

    /// Sampling temperature sent to every model
    pub temperature: f32,

    /// Output token cap for Gemini
    pub gemini_max_tokens: u32,

    /// Output token cap for the chat-completion services
    pub chat_max_tokens: u32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            failure_threshold: 3,
            local_fallback: false,
            gemini_model: "gemini-1.5-flash".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            temperature: 0.3,
            gemini_max_tokens: 800,
            chat_max_tokens: 600,
        }
    }
}

/// Where durable state lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub cache_dir: PathBuf,
    pub checkpoint_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("output/cache"),
            checkpoint_path: PathBuf::from("output/checkpoint.json"),
        }
    }
}

/// Batch execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Barcodes resolved at once (1 = strictly sequential)
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Base URL overrides. Unset means the public endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub open_food_facts: Option<String>,
    pub google: Option<String>,
    pub digiteyes: Option<String>,
    pub gemini: Option<String>,
    pub openai: Option<String>,
    pub deepseek: Option<String>,
}

impl Config {
    /// Check for problems that make a batch pointless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "batch.concurrency must be at least 1".to_string(),
            ));
        }
        if self.enhancers.failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "enhancers.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.usable_sources().is_empty() {
            return Err(ConfigError::NoSources);
        }
        Ok(())
    }

    /// Names of the data sources that will actually be queried, in order.
    pub fn usable_sources(&self) -> Vec<&'static str> {
        let mut sources = Vec::new();
        if self.sources.open_food_facts {
            sources.push("OpenFoodFacts");
        }
        if self.sources.google && self.credentials.google().is_some() {
            sources.push("Google");
        }
        if self.sources.digiteyes && self.credentials.digiteyes().is_some() {
            sources.push("DigitEyes");
        }
        sources
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("barcode-resolver"))
}

/// Get the full path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, a missing default config file
/// means defaults. A file that exists but can't be read or parsed is an error
/// either way; running a long batch on silently wrong settings is worse than
/// not running.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.to_path_buf()));
            }
            p.to_path_buf()
        }
        None => {
            let Some(default) = config_path() else {
                tracing::warn!("Could not determine config directory, using defaults");
                return Ok(Config::default());
            };
            if !default.exists() {
                tracing::info!("No config file found at {:?}, using defaults", default);
                return Ok(Config::default());
            }
            default
        }
    };

    let contents =
        std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
    let config = parse(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Parse a TOML config string.
pub fn parse(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("No usable data source: enable Open Food Facts or configure Google/Digit-Eyes credentials")]
    NoSources,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
