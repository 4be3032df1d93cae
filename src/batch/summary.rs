//! End-of-run counters.

use serde::Serialize;
use tracing::info;

use crate::enhancers::EnhancerStats;
use crate::model::{ProductRecord, RecordStatus};
use crate::sources::{AttemptOutcome, SourceAttempt};

/// How one data source fared over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStats {
    pub name: String,
    /// Barcodes the source was asked about
    pub attempted: u32,
    pub hits: u32,
    pub empty: u32,
    pub failed: u32,
    /// HTTP calls made, retries included
    pub calls: u32,
}

impl SourceStats {
    /// Share of attempted barcodes the source resolved.
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.hits as f64 / self.attempted as f64
        }
    }
}

/// What a batch run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Rows in the input file
    pub total_rows: usize,
    /// Barcodes finalized during this run
    pub finalized: usize,
    /// Final records by status, resumed ones included
    pub found: usize,
    pub not_found: usize,
    pub invalid: usize,
    /// Barcodes answered from the cache
    pub cache_hits: usize,
    /// Rows skipped because an earlier run finalized them
    pub resumed: usize,
    /// Rows repeating a barcode seen earlier in the input
    pub duplicates: usize,
    /// Stopped before every row was finalized
    pub interrupted: bool,
    pub sources: Vec<SourceStats>,
    pub enhancers: Vec<EnhancerStats>,
}

impl BatchSummary {
    pub(crate) fn new(total_rows: usize, source_names: Vec<String>) -> Self {
        Self {
            total_rows,
            sources: source_names
                .into_iter()
                .map(|name| SourceStats {
                    name,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Fold one barcode's attempt log into the per-source counters.
    pub(crate) fn record_attempts(&mut self, attempts: &[SourceAttempt]) {
        for attempt in attempts {
            let Some(stats) = self.sources.iter_mut().find(|s| s.name == attempt.source) else {
                continue;
            };
            stats.calls += attempt.calls;
            match attempt.outcome {
                AttemptOutcome::Hit => stats.hits += 1,
                AttemptOutcome::Empty => stats.empty += 1,
                AttemptOutcome::Failed(_) => stats.failed += 1,
                AttemptOutcome::Skipped => continue,
            }
            stats.attempted += 1;
        }
    }

    /// Count final records by status.
    pub(crate) fn tally(&mut self, records: &[ProductRecord]) {
        self.found = 0;
        self.not_found = 0;
        self.invalid = 0;
        for record in records {
            match record.status {
                RecordStatus::Found => self.found += 1,
                RecordStatus::NotFound => self.not_found += 1,
                RecordStatus::Invalid => self.invalid += 1,
            }
        }
    }

    /// Write the summary to the log.
    pub fn log(&self) {
        info!(
            "Batch {}: {} rows, {} finalized this run, {} resumed, {} from cache, {} duplicates",
            if self.interrupted { "interrupted" } else { "complete" },
            self.total_rows,
            self.finalized,
            self.resumed,
            self.cache_hits,
            self.duplicates
        );
        info!(
            "Records: {} found, {} not found, {} invalid",
            self.found, self.not_found, self.invalid
        );
        for source in &self.sources {
            info!(
                "  {}: {}/{} resolved ({:.0}%), {} failed, {} calls",
                source.name,
                source.hits,
                source.attempted,
                source.success_rate() * 100.0,
                source.failed,
                source.calls
            );
        }
        for enhancer in &self.enhancers {
            let status = enhancer
                .disabled
                .as_deref()
                .map(|reason| format!(", disabled: {}", reason))
                .unwrap_or_default();
            info!(
                "  {}: {}/{} enhanced, {} skipped{}",
                enhancer.name, enhancer.succeeded, enhancer.attempted, enhancer.skipped, status
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{NormalizeError, normalize};
    use crate::retry::FailureKind;

    fn attempt(source: &str, outcome: AttemptOutcome, calls: u32) -> SourceAttempt {
        SourceAttempt {
            source: source.to_string(),
            outcome,
            calls,
        }
    }

    #[test]
    fn test_record_attempts() {
        let mut summary = BatchSummary::new(2, vec!["A".to_string(), "B".to_string()]);
        summary.record_attempts(&[
            attempt("A", AttemptOutcome::Failed(FailureKind::Transient), 3),
            attempt("B", AttemptOutcome::Hit, 1),
        ]);
        summary.record_attempts(&[
            attempt("A", AttemptOutcome::Hit, 1),
            attempt("B", AttemptOutcome::Skipped, 0),
        ]);

        let a = &summary.sources[0];
        assert_eq!((a.attempted, a.hits, a.failed, a.calls), (2, 1, 1, 4));
        assert!((a.success_rate() - 0.5).abs() < f64::EPSILON);

        let b = &summary.sources[1];
        assert_eq!((b.attempted, b.hits, b.calls), (1, 1, 1));
    }

    #[test]
    fn test_success_rate_without_attempts() {
        assert_eq!(SourceStats::default().success_rate(), 0.0);
    }

    #[test]
    fn test_tally() {
        let key = normalize("0012345678905").unwrap();
        let mut summary = BatchSummary::default();
        summary.tally(&[
            ProductRecord::not_found(&key),
            ProductRecord::invalid("12", &NormalizeError::InvalidLength(2)),
            ProductRecord::not_found(&key),
        ]);
        assert_eq!((summary.found, summary.not_found, summary.invalid), (0, 2, 1));
    }
}
