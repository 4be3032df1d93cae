//! Mock enhancers and language models for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EnhancementRequest, Enhancer, LanguageModel, StructuredFields};
use crate::model::EnhancerKind;
use crate::retry::RemoteError;
use crate::test_utils::CallLog;

type Answer = Result<StructuredFields, RemoteError>;

/// Mock AI enhancer with a fixed response.
pub struct MockEnhancer {
    name: String,
    /// Answers returned first, one per call
    script: Mutex<VecDeque<Answer>>,
    /// Answer once the script is used up
    answer: Answer,
    calls: AtomicU32,
    log: Option<CallLog>,
}

impl MockEnhancer {
    /// Fields a model would return for a household product called `name`.
    pub fn fields(name: &str) -> StructuredFields {
        StructuredFields {
            name: Some(name.to_string()),
            brand: name.split_whitespace().next().map(String::from),
            category: Some("Household".to_string()),
            subcategory: Some("Dishwashing".to_string()),
            features: vec!["Cuts grease".to_string()],
            ..Default::default()
        }
    }

    /// Create a mock that always returns `answer`.
    pub fn returning(name: &str, answer: Answer) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            answer,
            calls: AtomicU32::new(0),
            log: None,
        }
    }

    /// Create a mock that structures every product as `product_name`.
    pub fn structuring(name: &str, product_name: &str) -> Self {
        Self::returning(name, Ok(Self::fields(product_name)))
    }

    /// Create a mock that always fails.
    pub fn failing(name: &str, error: RemoteError) -> Self {
        Self::returning(name, Err(error))
    }

    /// Answer the next calls with `answers` before the regular response.
    pub fn scripted(self, answers: Vec<Answer>) -> Self {
        self.script.lock().extend(answers);
        self
    }

    /// Record calls into a shared log.
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Enhancer for MockEnhancer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EnhancerKind {
        EnhancerKind::Ai
    }

    async fn enhance(&self, _request: &EnhancementRequest) -> Answer {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.record(&self.name);
        }

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.answer.clone())
    }
}

/// Mock language model returning canned text.
pub struct MockModel {
    answer: Result<String, RemoteError>,
}

impl MockModel {
    pub fn answering(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
        }
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, _prompt: &str) -> Result<String, RemoteError> {
        self.answer.clone()
    }

    fn provider_name(&self) -> &str {
        "MockModel"
    }

    fn model_name(&self) -> &str {
        "mock-1"
    }
}
