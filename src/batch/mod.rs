//! Batch orchestration.
//!
//! Drives every input row through the pipeline:
//!
//! 1. Normalize the barcode (invalid input is finalized straight away)
//! 2. Skip rows finalized by an earlier run, and repeats within this one
//! 3. Answer from the cache when possible
//! 4. Otherwise resolve through the source chain and, for a hit, the
//!    enhancer chain
//! 5. Write the cache, then the checkpoint
//!
//! Remote work for several barcodes may run at once (`concurrency`), but the
//! cache and checkpoint are only ever written from the task that called
//! [`BatchRunner::run`], one barcode at a time.

mod summary;

use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{StreamExt, future, stream};
use tracing::{debug, info, warn};

use crate::barcode::{BarcodeKey, NormalizeError, normalize};
use crate::cache::CacheStore;
use crate::checkpoint::{self, CheckpointManager};
use crate::config::Config;
use crate::enhancers::{self, EnhancerChain};
use crate::error::Result;
use crate::model::{ProductRecord, Provenance};
use crate::sources::prefix::PrefixTable;
use crate::sources::{self, Resolution, ResolverChain, SourceAttempt};

pub use summary::{BatchSummary, SourceStats};

/// One row of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    pub barcode: String,
    /// Product name supplied alongside the barcode, if any
    pub known_name: Option<String>,
}

impl InputRow {
    pub fn new(barcode: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            known_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.known_name = Some(name.into());
        self
    }
}

/// Asks a running batch to stop after the barcode in hand.
///
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records in input order plus what the run did.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub records: Vec<ProductRecord>,
    pub summary: BatchSummary,
}

/// Work for one distinct barcode.
enum Job {
    Invalid {
        raw: String,
        error: NormalizeError,
    },
    Resolve {
        key: BarcodeKey,
        known_name: Option<String>,
    },
}

/// Where a finished record came from.
enum Origin {
    Invalid,
    Cache,
    Resolved {
        attempts: Vec<SourceAttempt>,
        cacheable: bool,
    },
}

struct Finished {
    checkpoint_key: String,
    key: Option<BarcodeKey>,
    record: ProductRecord,
    origin: Origin,
}

/// Runs batches against one set of chains and one cache.
pub struct BatchRunner {
    resolver: ResolverChain,
    enhancers: EnhancerChain,
    cache: CacheStore,
    concurrency: usize,
    stop: StopSignal,
}

impl BatchRunner {
    pub fn new(resolver: ResolverChain, enhancers: EnhancerChain, cache: CacheStore) -> Self {
        Self {
            resolver,
            enhancers,
            cache,
            concurrency: 1,
            stop: StopSignal::default(),
        }
    }

    /// Build the runner a configuration describes.
    ///
    /// Fails when the configuration is unusable or the cache directory cannot
    /// be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        // One pacer for both chains; intervals are tracked per service name
        let pacer = Arc::new(config.retry.pacer());
        let resolver = ResolverChain::new(
            sources::build_sources(config),
            PrefixTable::new(config.prefix_rules.clone()),
            config.retry.policy(),
            Arc::clone(&pacer),
        );
        let enhancer_chain = EnhancerChain::new(
            enhancers::build_enhancers(config),
            config.retry.policy_with_budget(config.enhancers.max_retries),
            pacer,
            config.enhancers.failure_threshold,
        );
        let cache = CacheStore::new(&config.storage.cache_dir)?;

        info!("Sources: {}", resolver.source_names().join(", "));
        if enhancer_chain.is_empty() {
            info!("No enhancers configured, records keep source data");
        }

        Ok(Self::new(resolver, enhancer_chain, cache).with_concurrency(config.batch.concurrency))
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Process every row not yet finalized in `checkpoint`.
    ///
    /// Only a checkpoint write failure is an error; remote failures end up
    /// as NotFound records.
    pub async fn run(
        &self,
        rows: &[InputRow],
        checkpoint: &mut CheckpointManager,
    ) -> Result<BatchReport> {
        let mut summary = BatchSummary::new(rows.len(), self.resolver.source_names());
        let jobs = self.plan(rows, checkpoint, &mut summary);
        let pending = jobs.len();
        info!(
            "{} barcodes to process ({} already finalized)",
            pending, summary.resumed
        );

        let stop = self.stop.clone();
        let mut finished = pin!(
            stream::iter(jobs)
                .take_while(move |_| future::ready(!stop.is_stopped()))
                .map(|job| self.process(job))
                .buffer_unordered(self.concurrency)
        );

        while let Some(done) = finished.next().await {
            self.finalize(done, checkpoint, &mut summary)?;
            if self.stop.is_stopped() {
                break;
            }
        }

        summary.interrupted = summary.finalized < pending;
        if summary.interrupted {
            warn!(
                "Stopped after {} of {} barcodes; rerun to resume",
                summary.finalized, pending
            );
        }

        let records = checkpoint.records_in_input_order();
        summary.tally(&records);
        summary.enhancers = self.enhancers.stats();
        Ok(BatchReport { records, summary })
    }

    /// Turn rows into jobs, dropping finalized and repeated barcodes.
    fn plan(
        &self,
        rows: &[InputRow],
        checkpoint: &CheckpointManager,
        summary: &mut BatchSummary,
    ) -> Vec<Job> {
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();

        for row in rows {
            let (checkpoint_key, job) = match normalize(&row.barcode) {
                Ok(key) => (
                    checkpoint::key_for(&key),
                    Job::Resolve {
                        key,
                        known_name: row.known_name.clone(),
                    },
                ),
                Err(error) => (
                    checkpoint::invalid_key(&row.barcode),
                    Job::Invalid {
                        raw: row.barcode.clone(),
                        error,
                    },
                ),
            };

            if !seen.insert(checkpoint_key.clone()) {
                debug!("Skipping repeated barcode {}", row.barcode.trim());
                summary.duplicates += 1;
            } else if checkpoint.is_finalized(&checkpoint_key) {
                summary.resumed += 1;
            } else {
                jobs.push(job);
            }
        }

        jobs
    }

    /// Produce the record for one job. Touches the network, never the disk
    /// beyond a cache read.
    async fn process(&self, job: Job) -> Finished {
        let (key, known_name) = match job {
            Job::Invalid { raw, error } => {
                warn!("Invalid barcode '{}': {}", raw.trim(), error);
                return Finished {
                    checkpoint_key: checkpoint::invalid_key(&raw),
                    key: None,
                    record: ProductRecord::invalid(&raw, &error),
                    origin: Origin::Invalid,
                };
            }
            Job::Resolve { key, known_name } => (key, known_name),
        };

        if let Some(entry) = self.cache.get(&key) {
            // The entry may have been written from another width of this GTIN
            let mut record = entry.record;
            record.barcode = key.digits().to_string();
            record.format = Some(key.format());
            return Finished {
                checkpoint_key: checkpoint::key_for(&key),
                record,
                key: Some(key),
                origin: Origin::Cache,
            };
        }

        let resolution = self.resolver.resolve(&key, known_name.as_deref()).await;
        // A fallback or a miss after a failed source may resolve better later
        let cacheable = resolution.is_remote_hit() || resolution.is_definitive();
        let Resolution { hit, attempts } = resolution;

        let record = match hit {
            None => {
                info!("{}: not found", key);
                ProductRecord::not_found(&key)
            }
            Some(hit) => {
                let enhancement = self.enhancers.enhance(&key, hit.details, &hit.source).await;
                ProductRecord::found(
                    &key,
                    enhancement.details,
                    Provenance {
                        source: Some(hit.source),
                        tier: Some(hit.tier),
                        enhancer: enhancement.enhancer,
                        enhancer_kind: enhancement.kind,
                    },
                )
            }
        };

        Finished {
            checkpoint_key: checkpoint::key_for(&key),
            key: Some(key),
            record,
            origin: Origin::Resolved {
                attempts,
                cacheable,
            },
        }
    }

    fn finalize(
        &self,
        done: Finished,
        checkpoint: &mut CheckpointManager,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        match (&done.origin, &done.key) {
            (Origin::Cache, _) => summary.cache_hits += 1,
            (Origin::Resolved { attempts, cacheable }, Some(key)) => {
                summary.record_attempts(attempts);
                if *cacheable {
                    // Losing a cache entry only costs a lookup next time
                    if let Err(e) = self.cache.put(key, &done.record) {
                        warn!("{}", e);
                    }
                } else {
                    debug!("{}: not cached, a source failed", key);
                }
            }
            _ => {}
        }

        checkpoint.mark_finalized(&done.checkpoint_key, done.record)?;
        summary.finalized += 1;
        Ok(())
    }
}
