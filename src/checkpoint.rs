//! Resumable batch progress.
//!
//! The checkpoint file records the input list a batch was started with and
//! every record finalized so far. It is rewritten after each finalized
//! barcode, so an interrupted run loses at most the barcodes that were in
//! flight.
//!
//! A checkpoint only resumes the list it was made for. Appending rows to the
//! input is fine; changing or removing a recorded row is a [`Mismatch`].
//!
//! [`Mismatch`]: CheckpointError::Mismatch

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::barcode::{BarcodeKey, normalize};
use crate::cache::write_atomic;
use crate::model::ProductRecord;

/// Checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Errors from loading or flushing a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error(
        "Input does not match checkpoint at row {row}: checkpoint has '{recorded}', input has '{current}' (use --reset-checkpoint to start over)"
    )]
    Mismatch {
        /// 1-based input row
        row: usize,
        recorded: String,
        current: String,
    },

    #[error("Checkpoint I/O error on {0}: {1}")]
    Io(PathBuf, #[source] io::Error),

    #[error("Cannot parse checkpoint {0}: {1}")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Checkpoint {0} is corrupt: stored fingerprint does not match its inputs")]
    Corrupt(PathBuf),

    #[error("Checkpoint version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("Barcode {0} is already finalized")]
    AlreadyFinalized(String),
}

/// Persisted checkpoint contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub version: u32,
    /// Raw barcodes in input order
    pub inputs: Vec<String>,
    /// SHA-256 of `inputs`, hex encoded
    pub fingerprint: String,
    /// Finalized records by checkpoint key
    pub records: BTreeMap<String, ProductRecord>,
    pub updated_at: DateTime<Utc>,
}

impl CheckpointState {
    fn new(inputs: Vec<String>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            fingerprint: fingerprint(&inputs),
            inputs,
            records: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Key a finalized record is stored under.
pub fn key_for(key: &BarcodeKey) -> String {
    key.as_str().to_string()
}

/// Key for input that failed normalization.
pub fn invalid_key(raw: &str) -> String {
    format!("invalid:{}", raw.trim())
}

/// Checkpoint key for a raw input barcode.
pub fn checkpoint_key(raw: &str) -> String {
    match normalize(raw) {
        Ok(key) => key_for(&key),
        Err(_) => invalid_key(raw),
    }
}

/// SHA-256 over the newline-joined inputs.
pub fn fingerprint(inputs: &[String]) -> String {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input.as_bytes());
        hasher.update(b"\n");
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Owns the checkpoint file for one batch.
pub struct CheckpointManager {
    path: PathBuf,
    state: CheckpointState,
}

impl CheckpointManager {
    /// Load the checkpoint at `path` for `inputs`, or start a new one.
    ///
    /// The file is written before this returns, so an unwritable location
    /// fails here rather than after the first barcode.
    pub fn load(path: impl Into<PathBuf>, inputs: &[String]) -> Result<Self, CheckpointError> {
        let path = path.into();
        let inputs: Vec<String> = inputs.iter().map(|s| s.trim().to_string()).collect();

        let state = match fs::read(&path) {
            Ok(data) => {
                let state: CheckpointState =
                    serde_json::from_slice(&data).map_err(|e| CheckpointError::Parse(path.clone(), e))?;
                let state = validate(&path, state, &inputs)?;
                info!(
                    "Resuming from checkpoint {} ({} of {} finalized)",
                    path.display(),
                    state.records.len(),
                    state.inputs.len()
                );
                state
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No checkpoint at {}, starting fresh", path.display());
                CheckpointState::new(inputs)
            }
            Err(e) => return Err(CheckpointError::Io(path, e)),
        };

        let manager = Self { path, state };
        manager.flush()?;
        Ok(manager)
    }

    /// Delete the checkpoint file, if any.
    pub fn reset(path: &Path) -> Result<(), CheckpointError> {
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed checkpoint {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckpointError::Io(path.to_path_buf(), e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finalized(&self, key: &str) -> bool {
        self.state.records.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ProductRecord> {
        self.state.records.get(key)
    }

    pub fn finalized_count(&self) -> usize {
        self.state.records.len()
    }

    /// Record a finished barcode and flush the checkpoint to disk.
    pub fn mark_finalized(&mut self, key: &str, record: ProductRecord) -> Result<(), CheckpointError> {
        if self.is_finalized(key) {
            return Err(CheckpointError::AlreadyFinalized(key.to_string()));
        }

        self.state.records.insert(key.to_string(), record);
        self.state.updated_at = Utc::now();
        if let Err(e) = self.flush() {
            self.state.records.remove(key);
            return Err(e);
        }
        Ok(())
    }

    /// Finalized records in input order, one per distinct barcode.
    pub fn records_in_input_order(&self) -> Vec<ProductRecord> {
        let mut seen = HashSet::new();
        self.state
            .inputs
            .iter()
            .map(|raw| checkpoint_key(raw))
            .filter(|key| seen.insert(key.clone()))
            .filter_map(|key| self.state.records.get(&key).cloned())
            .collect()
    }

    fn flush(&self) -> Result<(), CheckpointError> {
        let data = serde_json::to_vec_pretty(&self.state)
            .map_err(|e| CheckpointError::Parse(self.path.clone(), e))?;
        write_atomic(&self.path, &data).map_err(|e| CheckpointError::Io(self.path.clone(), e))
    }
}

/// Check a stored state against the current input, adopting appended rows.
fn validate(
    path: &Path,
    mut state: CheckpointState,
    inputs: &[String],
) -> Result<CheckpointState, CheckpointError> {
    if state.version != CHECKPOINT_VERSION {
        return Err(CheckpointError::Version {
            found: state.version,
            expected: CHECKPOINT_VERSION,
        });
    }
    if state.fingerprint != fingerprint(&state.inputs) {
        return Err(CheckpointError::Corrupt(path.to_path_buf()));
    }

    for (index, recorded) in state.inputs.iter().enumerate() {
        match inputs.get(index) {
            Some(current) if current == recorded => {}
            current => {
                return Err(CheckpointError::Mismatch {
                    row: index + 1,
                    recorded: recorded.clone(),
                    current: current.cloned().unwrap_or_else(|| "<end of input>".to_string()),
                });
            }
        }
    }

    if inputs.len() > state.inputs.len() {
        info!(
            "Input extends checkpoint by {} rows",
            inputs.len() - state.inputs.len()
        );
        state.inputs = inputs.to_vec();
        state.fingerprint = fingerprint(&state.inputs);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::NormalizeError;
    use tempfile::TempDir;

    fn inputs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn not_found(raw: &str) -> (String, ProductRecord) {
        let key = normalize(raw).unwrap();
        (key_for(&key), ProductRecord::not_found(&key))
    }

    #[test]
    fn test_fresh_checkpoint_is_written() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join("checkpoint.json");

        let manager = CheckpointManager::load(&path, &inputs(&["0012345678905"])).unwrap();
        assert_eq!(manager.finalized_count(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_finalized_records_survive_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint.json");
        let list = inputs(&["4006381333931", "0012345678905"]);

        let mut manager = CheckpointManager::load(&path, &list).unwrap();
        let (key, record) = not_found("0012345678905");
        manager.mark_finalized(&key, record.clone()).unwrap();
        drop(manager);

        let manager = CheckpointManager::load(&path, &list).unwrap();
        assert!(manager.is_finalized(&key));
        assert!(!manager.is_finalized(&checkpoint_key("4006381333931")));
        assert_eq!(manager.get(&key), Some(&record));
    }

    #[test]
    fn test_double_finalize_rejected() {
        let temp = TempDir::new().unwrap();
        let mut manager =
            CheckpointManager::load(temp.path().join("c.json"), &inputs(&["0012345678905"])).unwrap();
        let (key, record) = not_found("0012345678905");

        manager.mark_finalized(&key, record.clone()).unwrap();
        let err = manager.mark_finalized(&key, record).unwrap_err();
        assert!(matches!(err, CheckpointError::AlreadyFinalized(_)));
    }

    #[test]
    fn test_changed_row_is_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint.json");
        CheckpointManager::load(&path, &inputs(&["4006381333931", "0012345678905"])).unwrap();

        let err = CheckpointManager::load(&path, &inputs(&["4006381333931", "8901030865278"]))
            .err()
            .unwrap();
        match err {
            CheckpointError::Mismatch { row, recorded, current } => {
                assert_eq!(row, 2);
                assert_eq!(recorded, "0012345678905");
                assert_eq!(current, "8901030865278");
            }
            other => panic!("expected mismatch, got {other}"),
        }
    }

    #[test]
    fn test_shorter_input_is_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint.json");
        CheckpointManager::load(&path, &inputs(&["4006381333931", "0012345678905"])).unwrap();

        let err = CheckpointManager::load(&path, &inputs(&["4006381333931"])).err().unwrap();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_appended_rows_are_adopted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint.json");
        let mut manager = CheckpointManager::load(&path, &inputs(&["0012345678905"])).unwrap();
        let (key, record) = not_found("0012345678905");
        manager.mark_finalized(&key, record).unwrap();

        let extended = inputs(&["0012345678905", "4006381333931"]);
        let manager = CheckpointManager::load(&path, &extended).unwrap();
        assert_eq!(manager.finalized_count(), 1);

        let saved: CheckpointState = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved.inputs, extended);
        assert_eq!(saved.fingerprint, fingerprint(&extended));
    }

    #[test]
    fn test_tampered_inputs_are_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint.json");
        CheckpointManager::load(&path, &inputs(&["0012345678905"])).unwrap();

        let mut state: CheckpointState = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        state.inputs.push("4006381333931".to_string());
        fs::write(&path, serde_json::to_vec(&state).unwrap()).unwrap();

        let err = CheckpointManager::load(&path, &inputs(&["0012345678905"])).err().unwrap();
        assert!(matches!(err, CheckpointError::Corrupt(_)));
    }

    #[test]
    fn test_records_in_input_order() {
        let temp = TempDir::new().unwrap();
        let list = inputs(&["4006381333931", "12ab", "0012345678905", "4006381333931"]);
        let mut manager = CheckpointManager::load(temp.path().join("c.json"), &list).unwrap();

        // Finalize out of order
        let (key, record) = not_found("0012345678905");
        manager.mark_finalized(&key, record).unwrap();
        manager
            .mark_finalized(
                &invalid_key("12ab"),
                ProductRecord::invalid("12ab", &NormalizeError::InvalidLength(2)),
            )
            .unwrap();
        let (key, record) = not_found("4006381333931");
        manager.mark_finalized(&key, record).unwrap();

        let barcodes: Vec<String> = manager
            .records_in_input_order()
            .into_iter()
            .map(|r| r.barcode)
            .collect();
        assert_eq!(barcodes, vec!["4006381333931", "12ab", "0012345678905"]);
    }

    #[test]
    fn test_reset_removes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint.json");
        CheckpointManager::load(&path, &inputs(&["0012345678905"])).unwrap();

        CheckpointManager::reset(&path).unwrap();
        assert!(!path.exists());
        // Resetting twice is fine
        CheckpointManager::reset(&path).unwrap();
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let a = fingerprint(&inputs(&["1", "2"]));
        let b = fingerprint(&inputs(&["2", "1"]));
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_checkpoint_key() {
        assert_eq!(checkpoint_key("0012345678905"), "00012345678905");
        assert_eq!(checkpoint_key(" 12ab "), "invalid:12ab");
    }
}
