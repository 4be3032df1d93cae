//! Test utilities and fixtures for barcode-resolver tests.
//!
//! This module provides common test helpers, shared call logs for mocks,
//! and temporary storage to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{temp_storage, sample_details, CallLog};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (storage, _dir) = temp_storage();
//!     let log = CallLog::default();
//!     // ... test logic
//! }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::config::StorageConfig;
use crate::model::ProductDetails;

/// Ordered record of remote calls, shared between mocks.
///
/// Cloning shares the same log, so one log handed to several mocks shows the
/// interleaving of their calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn record(&self, name: &str) {
        self.calls.lock().push(name.to_string());
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls made to `name`.
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == name).count()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

/// Creates cache and checkpoint locations inside a temporary directory.
///
/// Keep the TempDir alive for the duration of your test.
pub fn temp_storage() -> (StorageConfig, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage = StorageConfig {
        cache_dir: dir.path().join("cache"),
        checkpoint_path: dir.path().join("checkpoint.json"),
    };
    (storage, dir)
}

/// Product details as a source would return them.
///
/// Use struct update syntax to customize:
///
/// ```ignore
/// let details = ProductDetails {
///     brand: None,
///     ..sample_details("Vim Bar")
/// };
/// ```
pub fn sample_details(name: &str) -> ProductDetails {
    ProductDetails {
        name: Some(name.to_string()),
        brand: name.split_whitespace().next().map(String::from),
        description: Some(format!("{} from the test fixtures", name)),
        ..Default::default()
    }
}

/// `count` valid EAN-13 barcodes with correct check digits.
pub fn valid_barcodes(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let payload = format!("400{:09}", i);
            let check = crate::barcode::compute_check_digit(&payload)
                .expect("payload is all digits");
            format!("{}{}", payload, check)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::normalize;

    #[test]
    fn test_valid_barcodes_verify() {
        let codes = valid_barcodes(25);
        assert_eq!(codes.len(), 25);
        for code in codes {
            let key = normalize(&code).unwrap();
            assert!(key.is_verified(), "{} should verify", code);
        }
    }

    #[test]
    fn test_call_log_is_shared() {
        let log = CallLog::default();
        let other = log.clone();
        log.record("a");
        other.record("b");
        assert_eq!(log.calls(), vec!["a", "b"]);
        assert_eq!(other.count("a"), 1);
    }
}
