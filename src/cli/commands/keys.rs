//! Credential check command.

use crate::config::{self, Config};

/// Report which credentials are set and what that enables
pub fn cmd_check_keys(config: &Config) -> anyhow::Result<()> {
    println!("Checking API credentials...\n");

    for (service, present) in config.credentials.report() {
        if present {
            println!("✓ {}", service);
        } else {
            println!("✗ {}: not set", service);
        }
    }

    println!();
    let sources = config.usable_sources();
    if sources.is_empty() {
        println!("✗ No usable data source");
    } else {
        println!("Data sources: {}", sources.join(" → "));
    }

    let enhancers = config.credentials.report()[2..]
        .iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();
    if !config.enhancers.enabled {
        println!("AI enhancement: disabled in config");
    } else if enhancers.is_empty() {
        println!("AI enhancement: no keys, records keep source data");
    } else {
        println!("AI enhancement: {}", enhancers.join(" → "));
    }
    if config.enhancers.local_fallback {
        println!("Local formatter: enabled");
    }

    if let Some(path) = config::config_path() {
        println!("\nConfig file: {:?}", path);
    }

    config.validate()?;
    Ok(())
}
