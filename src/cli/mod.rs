//! Command-line interface for barcode-resolver.
//!
//! Thin wrappers around the batch engine: reading the barcode list, writing
//! the JSON report, and a few maintenance commands.

mod commands;
pub mod input;

pub use commands::{Cli, Commands, run_command};
