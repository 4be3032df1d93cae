//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while the CLI
//! uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level error enum, holding only the conditions that stop a
//!   batch (bad configuration, checkpoint mismatch, lost durability)
//! - Module-specific errors (e.g. [`RemoteError`](crate::retry::RemoteError))
//!   never reach this level; remote failures degrade to the next fallback
//!
//! # Example
//!
//! ```ignore
//! use barcode_resolver::error::{Error, Result};
//!
//! fn start(config: &Config, rows: &[InputRow]) -> Result<()> {
//!     config.validate()?;                          // Config errors auto-convert
//!     let checkpoint = CheckpointManager::load(path, &raw)?; // So do checkpoint errors
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use crate::cache::CacheError;
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Checkpoint could not be loaded, validated, or flushed
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Cache directory is unusable
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Input file could not be parsed
    #[error("Invalid input file {path}: {message}")]
    Input { path: PathBuf, message: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an input error.
    pub fn input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, CheckpointError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Checkpoint(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = Error::input("/data/barcodes.csv", "line 3: empty barcode");
        let msg = err.to_string();
        assert!(msg.contains("/data/barcodes.csv"));
        assert!(msg.contains("line 3"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::from(ConfigError::NoSources).context("while starting batch");
        let msg = err.to_string();
        assert!(msg.contains("while starting batch"));
        assert!(msg.contains("data source"));
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let with_ctx = result.with_context("reading input");
        assert!(with_ctx.unwrap_err().to_string().contains("reading input"));
    }
}
