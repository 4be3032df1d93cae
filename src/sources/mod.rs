//! Product data sources.
//!
//! Each remote database lives in its own submodule, split the same way:
//!
//! - `dto.rs`: raw API response shapes (never leave the submodule)
//! - `adapter.rs`: the only place DTOs become [`ProductDetails`]
//! - `client.rs`: HTTP plumbing
//!
//! The clients are tied together by the [`ProductSource`] trait and queried in
//! a fixed order by the [`ResolverChain`]. When every remote source comes up
//! empty, the chain falls back to the [`prefix`] table and then to the product
//! name supplied with the input row.

mod chain;
pub mod digiteyes;
pub mod google;
pub mod openfoodfacts;
pub mod prefix;

#[cfg(test)]
pub mod mocks;

use std::sync::Arc;

use async_trait::async_trait;

use crate::barcode::BarcodeKey;
use crate::config::Config;
use crate::model::{ProductDetails, SourceTier};
use crate::retry::RemoteError;

pub use chain::{AttemptOutcome, Resolution, ResolverChain, SourceAttempt, SourceHit};

/// Source name used for prefix-table records
pub const PREFIX_TABLE_SOURCE: &str = "PrefixTable";

/// Source name used for records built from the input row's product name
pub const INPUT_HINT_SOURCE: &str = "InputHint";

/// A remote product database.
///
/// `query` returns `Ok(None)` for a definitive "not known here"; errors are
/// classified so the retry layer knows whether to try again.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Stable name, used in logs, provenance and pacing.
    fn name(&self) -> &str;

    fn tier(&self) -> SourceTier;

    async fn query(&self, key: &BarcodeKey) -> Result<Option<ProductDetails>, RemoteError>;
}

// Implement the trait for real clients

#[async_trait]
impl ProductSource for openfoodfacts::OpenFoodFactsClient {
    fn name(&self) -> &str {
        "OpenFoodFacts"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Primary
    }

    async fn query(&self, key: &BarcodeKey) -> Result<Option<ProductDetails>, RemoteError> {
        self.lookup(key).await
    }
}

#[async_trait]
impl ProductSource for google::GoogleSearchClient {
    fn name(&self) -> &str {
        "Google"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::WebSearch
    }

    async fn query(&self, key: &BarcodeKey) -> Result<Option<ProductDetails>, RemoteError> {
        self.lookup(key).await
    }
}

#[async_trait]
impl ProductSource for digiteyes::DigitEyesClient {
    fn name(&self) -> &str {
        "DigitEyes"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Specialized
    }

    async fn query(&self, key: &BarcodeKey) -> Result<Option<ProductDetails>, RemoteError> {
        self.lookup(key).await
    }
}

/// Build the configured sources in chain order.
///
/// Sources that are switched off or lack credentials are left out entirely.
pub fn build_sources(config: &Config) -> Vec<Arc<dyn ProductSource>> {
    let timeout = config.retry.request_timeout();
    let endpoints = &config.endpoints;
    let mut sources: Vec<Arc<dyn ProductSource>> = Vec::new();

    if config.sources.open_food_facts {
        sources.push(Arc::new(openfoodfacts::OpenFoodFactsClient::new(
            endpoints
                .open_food_facts
                .as_deref()
                .unwrap_or(openfoodfacts::DEFAULT_BASE_URL),
            timeout,
        )));
    }

    if config.sources.google {
        match config.credentials.google() {
            Some((key, cx)) => sources.push(Arc::new(google::GoogleSearchClient::new(
                key,
                cx,
                endpoints.google.as_deref().unwrap_or(google::DEFAULT_BASE_URL),
                timeout,
            ))),
            None => tracing::info!("Google Custom Search credentials not set, skipping source"),
        }
    }

    if config.sources.digiteyes {
        match config.credentials.digiteyes() {
            Some((app_key, signature)) => {
                sources.push(Arc::new(digiteyes::DigitEyesClient::new(
                    app_key,
                    signature,
                    endpoints
                        .digiteyes
                        .as_deref()
                        .unwrap_or(digiteyes::DEFAULT_BASE_URL),
                    timeout,
                )))
            }
            None => tracing::info!("Digit-Eyes credentials not set, skipping source"),
        }
    }

    sources
}
