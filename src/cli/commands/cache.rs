//! Cache maintenance commands.

use crate::cache::CacheStore;
use crate::config::Config;

use super::format_bytes;

/// Show how many products are cached and how much space they take
pub fn cmd_cache_stats(config: &Config) -> anyhow::Result<()> {
    let cache = CacheStore::new(&config.storage.cache_dir)?;

    println!("Cache: {:?}", cache.dir());
    println!("  Entries: {}", cache.len());
    println!("  Size:    {}", format_bytes(cache.size_bytes()));
    Ok(())
}

/// Delete every cached product
pub fn cmd_cache_clear(config: &Config) -> anyhow::Result<()> {
    let cache = CacheStore::new(&config.storage.cache_dir)?;
    let removed = cache.clear()?;

    println!("✓ Removed {} cached products from {:?}", removed, cache.dir());
    Ok(())
}
