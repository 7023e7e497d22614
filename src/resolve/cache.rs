//! Resolution cache: namespaced key → JSON value with expiry.
//!
//! Two backends implement [`ResolutionCache`]:
//!
//! * [`DiskCache`]: one JSON file per key under a cache directory, written
//!   atomically (temp file + rename), so it survives process restarts and
//!   tolerates concurrent writers (last write wins).
//! * [`MemoryCache`]: a mutex-guarded map, used when no directory is
//!   configured or the directory cannot be created or written to.
//!
//! Every failure inside a backend is swallowed: a failed read is a miss and
//! a failed write is a no-op. Resolvers stay correct with no cache at all.
//!
//! [`DiskCache`] uses blocking `std::fs` calls from async resolvers. Entries
//! are a few hundred bytes and each lookup touches at most one of them, so
//! the calls stay on the runtime thread instead of going through
//! `spawn_blocking`.

use crate::config::ResolverConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Key-value store shared by the resolvers.
///
/// Implementations must be safe for concurrent `get`/`set` on the same or
/// different keys and must never panic or report errors.
pub trait ResolutionCache: Send + Sync {
    /// Fetch a live entry.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    fn set(&self, key: &str, value: &Value, ttl: Duration);
}

/// Open the cache described by `config`.
///
/// Falls back to a [`MemoryCache`] when `cache_dir` is `None` or unusable.
pub fn open_cache(config: &ResolverConfig) -> Arc<dyn ResolutionCache> {
    match &config.cache_dir {
        Some(dir) => match DiskCache::open(dir) {
            Ok(cache) => {
                debug!("Using disk cache at {}", dir.display());
                Arc::new(cache)
            }
            Err(e) => {
                warn!(
                    "Disk cache unavailable at {} ({}); using in-memory cache",
                    dir.display(),
                    e
                );
                Arc::new(MemoryCache::new())
            }
        },
        None => Arc::new(MemoryCache::new()),
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ── Disk ─────────────────────────────────────────────────────────────────────

/// Durable cache: `<dir>/<sha256(key)>.json`.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    expires_at: u64,
    value: Value,
}

impl DiskCache {
    /// Create the directory if needed and check that entries can be written
    /// into it.
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        // Removed again on drop.
        tempfile::NamedTempFile::new_in(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn write_entry(&self, path: &Path, entry: &DiskEntry) -> std::io::Result<()> {
        let data = serde_json::to_vec(entry)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl ResolutionCache for DiskCache {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.entry_path(key);
        let data = std::fs::read(&path).ok()?;
        let entry: DiskEntry = match serde_json::from_slice(&data) {
            Ok(e) => e,
            Err(e) => {
                debug!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };
        // Stale and corrupt files are left for the next `set` to replace; a
        // delete here could race with a concurrent writer of the same key.
        if entry.key != key || now_secs() >= entry.expires_at {
            return None;
        }
        Some(entry.value)
    }

    fn set(&self, key: &str, value: &Value, ttl: Duration) {
        let path = self.entry_path(key);
        let entry = DiskEntry {
            key: key.to_string(),
            expires_at: now_secs().saturating_add(ttl.as_secs()),
            value: value.clone(),
        };
        if let Err(e) = self.write_entry(&path, &entry) {
            debug!("Cache write failed for {}: {}", path.display(), e);
        }
    }
}

// ── Memory ───────────────────────────────────────────────────────────────────

/// Process-local cache; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Value, Option<SystemTime>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResolutionCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get(key)? {
            (_, Some(expires)) => SystemTime::now() >= *expires,
            (_, None) => false,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|(value, _)| value.clone())
    }

    fn set(&self, key: &str, value: &Value, ttl: Duration) {
        // `None` when the TTL overflows the clock: never expires.
        let expires = SystemTime::now().checked_add(ttl);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value.clone(), expires));
        }
    }
}
