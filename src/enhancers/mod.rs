//! AI enhancement of resolved products.
//!
//! Raw source data is often thin: a name and a brand, maybe a snippet of web
//! text. Enhancers turn that into a full entry (category, features,
//! specifications, ...). Their output only ever fills empty fields; what a
//! source reported is never overwritten.
//!
//! # Layers
//!
//! - [`LanguageModel`]: one remote text-completion API (Gemini, OpenAI,
//!   DeepSeek). Knows HTTP, nothing about products.
//! - [`AiEnhancer`]: wraps a model with the product prompt and response
//!   parsing ([`prompt`]).
//! - [`LocalFormatter`]: offline keyword heuristics, optional last link.
//! - [`EnhancerChain`]: tries enhancers in order, with retries and a circuit
//!   breaker that stops calling services that keep failing.

mod chain;
mod gemini;
mod local;
mod openai;
pub mod prompt;

#[cfg(test)]
pub mod mocks;

use std::sync::Arc;

use async_trait::async_trait;

use crate::barcode::BarcodeKey;
use crate::config::Config;
use crate::model::{EnhancerKind, ProductDetails};
use crate::retry::RemoteError;

pub use chain::{Enhancement, EnhancerChain, EnhancerStats};
pub use gemini::GeminiModel;
pub use local::LocalFormatter;
pub use openai::ChatCompletionModel;
pub use prompt::StructuredFields;

/// Everything an enhancer gets to see about a product.
#[derive(Debug, Clone)]
pub struct EnhancementRequest {
    pub key: BarcodeKey,
    pub details: ProductDetails,
    /// Data source that produced `details`
    pub source: String,
}

/// Something that can structure product data.
#[async_trait]
pub trait Enhancer: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> EnhancerKind;

    async fn enhance(&self, request: &EnhancementRequest) -> Result<StructuredFields, RemoteError>;
}

/// A remote text-completion API.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a prompt, get the model's text back.
    async fn complete(&self, prompt: &str) -> Result<String, RemoteError>;

    /// Service name, e.g. "Gemini"
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

/// Enhancer backed by a language model.
pub struct AiEnhancer<M> {
    model: M,
}

impl<M: LanguageModel> AiEnhancer<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: LanguageModel> Enhancer for AiEnhancer<M> {
    fn name(&self) -> &str {
        self.model.provider_name()
    }

    fn kind(&self) -> EnhancerKind {
        EnhancerKind::Ai
    }

    async fn enhance(&self, request: &EnhancementRequest) -> Result<StructuredFields, RemoteError> {
        let text = self.model.complete(&prompt::build_prompt(request)).await?;
        prompt::parse_response(&text)
    }
}

/// Build the configured enhancers in chain order.
///
/// Services without an API key are left out. Returns an empty list when
/// enhancement is switched off.
pub fn build_enhancers(config: &Config) -> Vec<Arc<dyn Enhancer>> {
    let settings = &config.enhancers;
    if !settings.enabled {
        return Vec::new();
    }

    let timeout = config.retry.request_timeout();
    let endpoints = &config.endpoints;
    let mut enhancers: Vec<Arc<dyn Enhancer>> = Vec::new();

    if let Some(key) = config.credentials.gemini() {
        enhancers.push(Arc::new(AiEnhancer::new(GeminiModel::new(
            key,
            &settings.gemini_model,
            endpoints.gemini.as_deref().unwrap_or(gemini::DEFAULT_BASE_URL),
            settings.temperature,
            settings.gemini_max_tokens,
            timeout,
        ))));
    }

    if let Some(key) = config.credentials.openai() {
        enhancers.push(Arc::new(AiEnhancer::new(ChatCompletionModel::new(
            "OpenAI",
            key,
            &settings.openai_model,
            endpoints.openai.as_deref().unwrap_or(openai::OPENAI_BASE_URL),
            settings.temperature,
            settings.chat_max_tokens,
            timeout,
        ))));
    }

    if let Some(key) = config.credentials.deepseek() {
        enhancers.push(Arc::new(AiEnhancer::new(ChatCompletionModel::new(
            "DeepSeek",
            key,
            &settings.deepseek_model,
            endpoints.deepseek.as_deref().unwrap_or(openai::DEEPSEEK_BASE_URL),
            settings.temperature,
            settings.chat_max_tokens,
            timeout,
        ))));
    }

    if settings.local_fallback {
        enhancers.push(Arc::new(LocalFormatter));
    }

    enhancers
}
