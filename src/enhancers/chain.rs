//! Ordered fallback across enhancers, with a circuit breaker.
//!
//! AI services fail in two very different ways. A flaky network or a busy
//! model fails now and then; a revoked key or an empty account fails every
//! single time. Calling the latter for each of thousands of barcodes burns
//! time on retries for nothing, so each service has a breaker:
//!
//! - auth or quota errors open it immediately
//! - `failure_threshold` barcodes in a row that the service could not
//!   enhance (after retries) open it too
//! - a success resets the count
//!
//! Once open, the service is skipped without a call for the rest of the run.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{EnhancementRequest, Enhancer};
use crate::barcode::BarcodeKey;
use crate::model::{EnhancerKind, ProductDetails};
use crate::retry::{self, Pacer, RemoteError, RetryPolicy};

/// Outcome of running the chain on one product.
#[derive(Debug, Clone, PartialEq)]
pub struct Enhancement {
    /// Source details with enhancer output merged into empty fields
    pub details: ProductDetails,
    /// Enhancer that succeeded, if any
    pub enhancer: Option<String>,
    pub kind: Option<EnhancerKind>,
}

/// Per-enhancer counters for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnhancerStats {
    pub name: String,
    /// Products the enhancer was called for
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Products passed over because the breaker was open
    pub skipped: u32,
    /// Why the breaker opened, if it did
    pub disabled: Option<String>,
}

#[derive(Debug, Default)]
struct Breaker {
    consecutive_failures: u32,
    stats: EnhancerStats,
}

impl Breaker {
    fn is_open(&self) -> bool {
        self.stats.disabled.is_some()
    }
}

/// Tries enhancers in order until one succeeds.
pub struct EnhancerChain {
    enhancers: Vec<Arc<dyn Enhancer>>,
    breakers: Mutex<Vec<Breaker>>,
    policy: RetryPolicy,
    pacer: Arc<Pacer>,
    failure_threshold: u32,
}

impl EnhancerChain {
    pub fn new(
        enhancers: Vec<Arc<dyn Enhancer>>,
        policy: RetryPolicy,
        pacer: Arc<Pacer>,
        failure_threshold: u32,
    ) -> Self {
        let breakers = enhancers
            .iter()
            .map(|e| Breaker {
                consecutive_failures: 0,
                stats: EnhancerStats {
                    name: e.name().to_string(),
                    ..Default::default()
                },
            })
            .collect();

        Self {
            enhancers,
            breakers: Mutex::new(breakers),
            policy,
            pacer,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// A chain that never changes anything.
    pub fn empty() -> Self {
        Self::new(
            Vec::new(),
            RetryPolicy::new(0, Default::default()),
            Arc::new(Pacer::new(Default::default())),
            1,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.enhancers.is_empty()
    }

    /// Enhance a resolved product.
    ///
    /// Never fails: when no enhancer succeeds the details come back as they
    /// went in.
    pub async fn enhance(
        &self,
        key: &BarcodeKey,
        details: ProductDetails,
        source: &str,
    ) -> Enhancement {
        let request = EnhancementRequest {
            key: key.clone(),
            details,
            source: source.to_string(),
        };

        for (index, enhancer) in self.enhancers.iter().enumerate() {
            let name = enhancer.name();

            if self.skip_if_open(index) {
                debug!("{}: {} disabled, skipping", key, name);
                continue;
            }

            match self.call(enhancer.as_ref(), &request).await {
                Ok(fields) => {
                    self.record_success(index);
                    let mut details = request.details;
                    let filled = details.merge_missing(&fields.into_details());
                    info!("{}: enhanced by {} ({} fields filled)", key, name, filled);
                    return Enhancement {
                        details,
                        enhancer: Some(name.to_string()),
                        kind: Some(enhancer.kind()),
                    };
                }
                Err(error) => self.record_failure(index, name, &error),
            }
        }

        if !self.enhancers.is_empty() {
            debug!("{}: no enhancer succeeded, keeping source data", key);
        }
        Enhancement {
            details: request.details,
            enhancer: None,
            kind: None,
        }
    }

    /// Counters for every enhancer, in chain order.
    pub fn stats(&self) -> Vec<EnhancerStats> {
        self.breakers.lock().iter().map(|b| b.stats.clone()).collect()
    }

    async fn call(
        &self,
        enhancer: &dyn Enhancer,
        request: &EnhancementRequest,
    ) -> Result<super::StructuredFields, RemoteError> {
        // Offline formatters need neither pacing nor retries
        if enhancer.kind() == EnhancerKind::Local {
            return enhancer.enhance(request).await;
        }

        let result = retry::execute(enhancer.name(), &self.policy, &self.pacer, move || {
            let call = enhancer.enhance(request);
            async move { call.await.map(Some) }
        })
        .await;

        match result {
            Ok(Some(fields)) => Ok(fields),
            Ok(None) => Err(RemoteError::Parse("empty answer".to_string())),
            Err(failure) => Err(failure.last),
        }
    }

    fn skip_if_open(&self, index: usize) -> bool {
        let mut breakers = self.breakers.lock();
        let breaker = &mut breakers[index];
        if breaker.is_open() {
            breaker.stats.skipped += 1;
            return true;
        }
        breaker.stats.attempted += 1;
        false
    }

    fn record_success(&self, index: usize) {
        let mut breakers = self.breakers.lock();
        let breaker = &mut breakers[index];
        breaker.consecutive_failures = 0;
        breaker.stats.succeeded += 1;
    }

    fn record_failure(&self, index: usize, name: &str, error: &RemoteError) {
        let mut breakers = self.breakers.lock();
        let breaker = &mut breakers[index];
        breaker.consecutive_failures += 1;
        breaker.stats.failed += 1;

        let reason = match error {
            RemoteError::Auth(_) | RemoteError::QuotaExhausted(_) => Some(error.to_string()),
            _ if breaker.consecutive_failures >= self.failure_threshold => Some(format!(
                "{} consecutive failures, last: {}",
                breaker.consecutive_failures, error
            )),
            _ => None,
        };

        match reason {
            Some(reason) => {
                warn!("{} disabled for the rest of the run: {}", name, reason);
                breaker.stats.disabled = Some(reason);
            }
            None => debug!("{} failed: {}", name, error),
        }
    }
}
