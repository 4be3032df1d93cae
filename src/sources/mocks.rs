//! Mock data sources for testing.
//!
//! Returns configurable responses for testing different scenarios, and
//! records every call so tests can assert on order and count.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::ProductSource;
use crate::barcode::BarcodeKey;
use crate::model::{ProductDetails, SourceTier};
use crate::retry::RemoteError;
use crate::test_utils::sample_details;

pub use crate::test_utils::CallLog;

type Answer = Result<Option<ProductDetails>, RemoteError>;
type Responder = Box<dyn Fn(&BarcodeKey) -> Answer + Send + Sync>;

/// Mock source with a fixed or per-barcode response.
pub struct MockSource {
    name: String,
    tier: SourceTier,
    /// Answers returned first, one per call
    script: Mutex<VecDeque<Answer>>,
    /// Answer once the script is used up
    respond: Responder,
    calls: AtomicU32,
    log: Option<CallLog>,
}

impl MockSource {
    /// Create a mock computing its answer from the barcode.
    pub fn with_responder(
        name: &str,
        tier: SourceTier,
        respond: impl Fn(&BarcodeKey) -> Answer + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            tier,
            script: Mutex::new(VecDeque::new()),
            respond: Box::new(respond),
            calls: AtomicU32::new(0),
            log: None,
        }
    }

    /// Create a mock that always returns `answer`.
    pub fn returning(name: &str, tier: SourceTier, answer: Answer) -> Self {
        Self::with_responder(name, tier, move |_| answer.clone())
    }

    /// Create a mock that knows every barcode by the same product.
    pub fn hit(name: &str, tier: SourceTier, product_name: &str) -> Self {
        Self::returning(name, tier, Ok(Some(sample_details(product_name))))
    }

    /// Create a mock that knows every barcode, naming it after the barcode.
    pub fn echo(name: &str, tier: SourceTier) -> Self {
        Self::with_responder(name, tier, |key| {
            Ok(Some(sample_details(&format!("Product {}", key.digits()))))
        })
    }

    /// Create a mock that knows nothing.
    pub fn empty(name: &str, tier: SourceTier) -> Self {
        Self::returning(name, tier, Ok(None))
    }

    /// Create a mock that always fails.
    pub fn failing(name: &str, tier: SourceTier, error: RemoteError) -> Self {
        Self::returning(name, tier, Err(error))
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
impl ProductSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> SourceTier {
        self.tier
    }

    async fn query(&self, key: &BarcodeKey) -> Answer {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.record(&self.name);
        }

        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(answer) => answer,
            None => (self.respond)(key),
        }
    }
}
