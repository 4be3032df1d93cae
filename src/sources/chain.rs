//! Ordered fallback across data sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, error, info, warn};

use super::prefix::PrefixTable;
use super::{INPUT_HINT_SOURCE, PREFIX_TABLE_SOURCE, ProductSource};
use crate::barcode::BarcodeKey;
use crate::model::{ProductDetails, SourceTier};
use crate::retry::{self, FailureKind, Pacer, RetryPolicy};

/// The data that resolved a barcode and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceHit {
    pub details: ProductDetails,
    pub source: String,
    pub tier: SourceTier,
}

/// Terminal outcome of one source for one barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Hit,
    Empty,
    Failed(FailureKind),
    /// Not called because an earlier source already hit
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceAttempt {
    pub source: String,
    pub outcome: AttemptOutcome,
    /// Calls made, retries included
    pub calls: u32,
}

/// Result of running the chain for one barcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// `None` means NotFound
    pub hit: Option<SourceHit>,
    /// One entry per configured source, in chain order
    pub attempts: Vec<SourceAttempt>,
}

impl Resolution {
    /// No source failed, so a rerun would get the same answer.
    pub fn is_definitive(&self) -> bool {
        !self
            .attempts
            .iter()
            .any(|a| matches!(a.outcome, AttemptOutcome::Failed(_)))
    }

    /// Resolved by a remote source rather than a fallback.
    pub fn is_remote_hit(&self) -> bool {
        self.hit.as_ref().is_some_and(|h| {
            !matches!(h.tier, SourceTier::PrefixTable | SourceTier::InputHint)
        })
    }
}

/// Queries sources in order and returns the first usable hit.
pub struct ResolverChain {
    sources: Vec<Arc<dyn ProductSource>>,
    prefix_table: PrefixTable,
    policy: RetryPolicy,
    pacer: Arc<Pacer>,
}

impl ResolverChain {
    pub fn new(
        sources: Vec<Arc<dyn ProductSource>>,
        prefix_table: PrefixTable,
        policy: RetryPolicy,
        pacer: Arc<Pacer>,
    ) -> Self {
        Self {
            sources,
            prefix_table,
            policy,
            pacer,
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Resolve a barcode.
    ///
    /// `hint` is a product name supplied with the input row; it is only used
    /// when nothing better turns up.
    pub async fn resolve(&self, key: &BarcodeKey, hint: Option<&str>) -> Resolution {
        let mut hit = None;
        let mut attempts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let name = source.name();

            if hit.is_some() {
                attempts.push(SourceAttempt {
                    source: name.to_string(),
                    outcome: AttemptOutcome::Skipped,
                    calls: 0,
                });
                continue;
            }

            let calls = AtomicU32::new(0);
            let result = {
                let calls = &calls;
                let source = source.as_ref();
                retry::execute(name, &self.policy, &self.pacer, move || {
                    calls.fetch_add(1, Ordering::Relaxed);
                    source.query(key)
                })
                .await
            };

            let outcome = match result {
                Ok(Some(details)) if details.has_name() => {
                    info!("{}: found via {}", key, name);
                    hit = Some(SourceHit {
                        details,
                        source: name.to_string(),
                        tier: source.tier(),
                    });
                    AttemptOutcome::Hit
                }
                Ok(_) => {
                    debug!("{}: no data from {}", key, name);
                    AttemptOutcome::Empty
                }
                Err(failure) => {
                    match failure.kind() {
                        FailureKind::Permanent => error!("{}: {}", key, failure),
                        FailureKind::Transient => warn!("{}: {}", key, failure),
                    }
                    AttemptOutcome::Failed(failure.kind())
                }
            };

            attempts.push(SourceAttempt {
                source: name.to_string(),
                outcome,
                calls: calls.into_inner(),
            });
        }

        if hit.is_none() {
            hit = self.fallback(key, hint);
        }

        Resolution { hit, attempts }
    }

    fn fallback(&self, key: &BarcodeKey, hint: Option<&str>) -> Option<SourceHit> {
        if let Some(class) = self.prefix_table.classify(key) {
            info!("{}: classified by prefix {}", key, class.prefix);
            return Some(SourceHit {
                details: class.to_details(),
                source: PREFIX_TABLE_SOURCE.to_string(),
                tier: SourceTier::PrefixTable,
            });
        }

        let name = hint.map(str::trim).filter(|h| !h.is_empty())?;
        info!("{}: using product name from input", key);
        Some(SourceHit {
            details: ProductDetails {
                name: Some(name.to_string()),
                ..Default::default()
            },
            source: INPUT_HINT_SOURCE.to_string(),
            tier: SourceTier::InputHint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::normalize;
    use crate::retry::RemoteError;
    use crate::sources::mocks::{CallLog, MockSource};
    use std::time::Duration;

    fn chain(sources: Vec<Arc<dyn ProductSource>>) -> ResolverChain {
        ResolverChain::new(
            sources,
            PrefixTable::default(),
            RetryPolicy::new(2, Duration::from_secs(1)),
            Arc::new(Pacer::new(Duration::ZERO)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_hit_short_circuits() {
        let log = CallLog::default();
        let primary = Arc::new(MockSource::empty("A", SourceTier::Primary).with_log(&log));
        let web = Arc::new(MockSource::hit("B", SourceTier::WebSearch, "Vim Bar").with_log(&log));
        let niche = Arc::new(MockSource::hit("C", SourceTier::Specialized, "Other").with_log(&log));

        let res = chain(vec![primary as Arc<dyn ProductSource>, web, niche.clone()])
            .resolve(&normalize("0012345678905").unwrap(), None)
            .await;

        let hit = res.hit.as_ref().unwrap();
        assert_eq!(hit.source, "B");
        assert_eq!(hit.tier, SourceTier::WebSearch);
        assert_eq!(log.calls(), vec!["A", "B"]);
        assert_eq!(niche.call_count(), 0);
        assert_eq!(res.attempts[2].outcome, AttemptOutcome::Skipped);
        assert!(res.is_definitive());
        assert!(res.is_remote_hit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_fall_through_in_order() {
        let log = CallLog::default();
        let auth = Arc::new(
            MockSource::failing("A", SourceTier::Primary, RemoteError::Auth("bad key".into()))
                .with_log(&log),
        );
        let down = Arc::new(
            MockSource::failing("B", SourceTier::WebSearch, RemoteError::Timeout).with_log(&log),
        );
        let niche = Arc::new(MockSource::hit("C", SourceTier::Specialized, "Vim Bar").with_log(&log));

        let res = chain(vec![auth.clone() as Arc<dyn ProductSource>, down.clone(), niche])
            .resolve(&normalize("0012345678905").unwrap(), None)
            .await;

        assert_eq!(res.hit.as_ref().unwrap().source, "C");
        // permanent: one call; transient: 1 + 2 retries
        assert_eq!(auth.call_count(), 1);
        assert_eq!(down.call_count(), 3);
        assert_eq!(log.calls(), vec!["A", "B", "B", "B", "C"]);
        assert_eq!(
            res.attempts[0].outcome,
            AttemptOutcome::Failed(FailureKind::Permanent)
        );
        assert_eq!(res.attempts[1].calls, 3);
        assert!(!res.is_definitive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nameless_hit_counts_as_empty() {
        let nameless = Arc::new(MockSource::returning(
            "A",
            SourceTier::Primary,
            Ok(Some(ProductDetails {
                brand: Some("Vim".to_string()),
                ..Default::default()
            })),
        ));
        let res = chain(vec![nameless as Arc<dyn ProductSource>])
            .resolve(&normalize("0012345678905").unwrap(), None)
            .await;
        assert!(res.hit.is_none());
        assert_eq!(res.attempts[0].outcome, AttemptOutcome::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_empty_no_prefix_is_not_found() {
        let res = chain(vec![
            Arc::new(MockSource::empty("A", SourceTier::Primary)) as Arc<dyn ProductSource>,
            Arc::new(MockSource::empty("B", SourceTier::WebSearch)),
        ])
        .resolve(&normalize("9999999999999").unwrap(), None)
        .await;

        assert!(res.hit.is_none());
        assert!(res.is_definitive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prefix_table_before_hint() {
        let res = chain(vec![Arc::new(MockSource::empty("A", SourceTier::Primary)) as Arc<dyn ProductSource>])
            .resolve(&normalize("8902102163005").unwrap(), Some("Vim Bar"))
            .await;

        let hit = res.hit.as_ref().unwrap();
        assert_eq!(hit.source, PREFIX_TABLE_SOURCE);
        assert_eq!(hit.tier, SourceTier::PrefixTable);
        assert_eq!(hit.details.category.as_deref(), Some("Household"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hint_used_last() {
        let res = chain(vec![Arc::new(MockSource::empty("A", SourceTier::Primary)) as Arc<dyn ProductSource>])
            .resolve(&normalize("9999999999999").unwrap(), Some("  Mystery Soap "))
            .await;

        let hit = res.hit.as_ref().unwrap();
        assert_eq!(hit.tier, SourceTier::InputHint);
        assert_eq!(hit.details.name.as_deref(), Some("Mystery Soap"));
        assert!(!res.is_remote_hit());
    }
}
