//! Barcode Resolver - turns product barcodes into structured product records.
//!
//! Each barcode is looked up in a ranked list of product databases, shaped
//! by a ranked list of AI services, and cached. Progress is checkpointed so
//! a large batch can be interrupted and resumed without repeating work.

pub mod barcode;
pub mod batch;
pub mod cache;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod enhancers;
pub mod error;
pub mod http;
pub mod model;
pub mod retry;
pub mod sources;
#[cfg(test)]
pub mod test_utils;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("barcode_resolver=info".parse()?))
        .init();

    if !cli::run_command(&args)? {
        // No command given
        cli::Cli::command().print_help()?;
    }
    Ok(())
}
