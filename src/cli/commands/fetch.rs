//! Batch barcode resolution command.

use std::path::Path;

use tokio::runtime::Runtime;
use tracing::warn;

use crate::batch::{BatchReport, BatchRunner};
use crate::cache::write_atomic;
use crate::checkpoint::CheckpointManager;
use crate::cli::input;
use crate::config::Config;
use crate::model::ProductRecord;

/// Resolve every barcode in `input` and write the report to `output`
pub fn cmd_fetch(
    rt: &Runtime,
    config: &Config,
    input: &Path,
    output: &Path,
    reset_checkpoint: bool,
) -> anyhow::Result<()> {
    let rows = input::read_rows(input)?;
    let raw: Vec<String> = rows.iter().map(|r| r.barcode.clone()).collect();

    let checkpoint_path = &config.storage.checkpoint_path;
    if reset_checkpoint {
        CheckpointManager::reset(checkpoint_path)?;
    }

    // Everything fatal is checked before the first remote call
    let runner = BatchRunner::from_config(config)?;
    let mut checkpoint = CheckpointManager::load(checkpoint_path, &raw)?;

    println!("Resolving {} barcodes from {:?}", rows.len(), input);
    println!("  Sources: {}", config.usable_sources().join(", "));
    println!();

    let report = rt.block_on(async {
        let stop = runner.stop_signal();
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing the barcode in hand");
                stop.stop();
            }
        });

        let report = runner.run(&rows, &mut checkpoint).await;
        listener.abort();
        report
    })?;

    write_report(output, &report.records)?;
    report.summary.log();
    print_summary(&report, output);
    Ok(())
}

fn write_report(path: &Path, records: &[ProductRecord]) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(records)?;
    write_atomic(path, &json)?;
    Ok(())
}

fn print_summary(report: &BatchReport, output: &Path) {
    let summary = &report.summary;

    if let Some(last) = report.records.last() {
        println!("{}", "=".repeat(60));
        println!("Last record: {} ({:?})", last.barcode, last.status);
        if let Some(name) = &last.details.name {
            println!("  Name:       {}", name);
        }
        if let Some(category) = &last.details.category {
            println!("  Category:   {}", category);
        }
        if let Some(source) = &last.provenance.source {
            println!("  Source:     {}", source);
        }
        println!("  Confidence: {:.2}", last.confidence);
        println!("{}", "=".repeat(60));
        println!();
    }

    if summary.interrupted {
        println!("⚠ Interrupted: rerun the same command to resume");
    }
    println!("✓ Wrote {} records to {:?}", report.records.len(), output);
    println!(
        "  Found: {}  Not found: {}  Invalid: {}",
        summary.found, summary.not_found, summary.invalid
    );
    println!(
        "  This run: {} finalized, {} from cache, {} resumed, {} duplicates",
        summary.finalized, summary.cache_hits, summary.resumed, summary.duplicates
    );
    for source in &summary.sources {
        println!(
            "  {:<14} {:>5}/{:<5} ({:.0}%)",
            source.name,
            source.hits,
            source.attempted,
            source.success_rate() * 100.0
        );
    }
    for enhancer in &summary.enhancers {
        let note = match &enhancer.disabled {
            Some(reason) => format!("  disabled: {}", reason),
            None => String::new(),
        };
        println!(
            "  {:<14} {:>5}/{:<5}{}",
            enhancer.name, enhancer.succeeded, enhancer.attempted, note
        );
    }
}
