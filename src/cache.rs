//! Resolved product disk cache.
//!
//! Caches finished records so a repeated run makes no remote calls for
//! barcodes it has already seen. One JSON file per barcode, named after the
//! canonical GTIN. Entries never expire; `cache clear` is the only eviction.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::barcode::BarcodeKey;
use crate::model::ProductRecord;

/// Entry format version. Entries with another version are ignored.
pub const CACHE_VERSION: u32 = 1;

/// Errors from the cache store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cannot create cache directory {0}: {1}")]
    CreateDir(PathBuf, #[source] io::Error),

    #[error("Cannot write cache entry {0}: {1}")]
    Write(PathBuf, #[source] io::Error),

    #[error("Cannot clear cache directory {0}: {1}")]
    Clear(PathBuf, #[source] io::Error),

    #[error("Cannot serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One cached record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub version: u32,
    /// Canonical GTIN
    pub key: String,
    pub record: ProductRecord,
    pub written_at: DateTime<Utc>,
}

/// Product record disk cache.
pub struct CacheStore {
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Open a cache in `cache_dir`, creating the directory if needed.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::CreateDir(cache_dir.clone(), e))?;
        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the cached entry for a barcode.
    ///
    /// Missing, unreadable and foreign-version files are all a miss.
    pub fn get(&self, key: &BarcodeKey) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&data) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.version != CACHE_VERSION {
            warn!(
                "Ignoring cache entry {} with version {} (expected {})",
                path.display(),
                entry.version,
                CACHE_VERSION
            );
            return None;
        }
        if entry.key != key.as_str() {
            warn!("Ignoring cache entry {} stored under another key", path.display());
            return None;
        }

        debug!("Cache hit for {}", key);
        Some(entry)
    }

    /// Store a record. Durable once this returns.
    pub fn put(&self, key: &BarcodeKey, record: &ProductRecord) -> Result<(), CacheError> {
        let entry = CacheEntry {
            version: CACHE_VERSION,
            key: key.as_str().to_string(),
            record: record.clone(),
            written_at: Utc::now(),
        };
        let data = serde_json::to_vec_pretty(&entry)?;
        let path = self.entry_path(key);
        write_atomic(&path, &data).map_err(|e| CacheError::Write(path, e))
    }

    /// Check if a barcode has a file in the cache.
    pub fn contains(&self, key: &BarcodeKey) -> bool {
        self.entry_path(key).exists()
    }

    /// Number of entries on disk.
    pub fn len(&self) -> usize {
        self.entry_files().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of the entries in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.entry_files()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }

    /// Delete every entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_files().collect::<Vec<_>>() {
            fs::remove_file(&path).map_err(|e| CacheError::Clear(self.cache_dir.clone(), e))?;
            removed += 1;
        }
        Ok(removed)
    }

    fn entry_path(&self, key: &BarcodeKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.as_str()))
    }

    fn entry_files(&self) -> impl Iterator<Item = PathBuf> {
        fs::read_dir(&self.cache_dir)
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_entry_file(p))
    }
}

/// `<gtin>.json`, where the GTIN is 8 or 14 digits. Anything else sharing
/// the directory is left alone.
fn is_entry_file(path: &Path) -> bool {
    if path.extension().is_none_or(|ext| ext != "json") {
        return false;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| {
            matches!(stem.len(), 8 | 14) && stem.bytes().all(|b| b.is_ascii_digit())
        })
}

/// Write `data` to `path` so a crash leaves either the old or the new file.
///
/// Writes a sibling temp file, syncs it, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    sync_parent(path)
}

/// Sync the directory holding `path` so the rename itself survives a crash.
#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}
