//! Detection result cache.
//!
//! In-process cache keyed by schema hash, optionally persisted as a JSON
//! file so repeated seeding runs against an unchanged schema skip detection.
//!
//! # Design
//!
//! - One `OnceCell` per schema hash: concurrent callers for the same schema
//!   share a single computation
//! - TTL per entry; an expired entry is replaced, not refreshed in place
//! - No cross-process locking (a single seeding process writes at a time)
//!
//! # File format
//!
//! ```json
//! [
//!   { "schema_hash": "9f2c…", "timestamp": 1700000000, "ttl": 3600,
//!     "result": { … }, "config_used": { … } }
//! ]
//! ```

mod hash;
pub use hash::{compute_hash, schema_hash};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::OnceCell;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A cached result with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub schema_hash: String,
    /// Unix seconds when the entry was computed.
    pub timestamp: u64,
    /// Lifetime in seconds.
    pub ttl: u64,
    pub result: T,
    /// Configuration the result was computed with.
    pub config_used: serde_json::Value,
}

impl<T> CacheEntry<T> {
    pub fn new(schema_hash: String, ttl: Duration, result: T, config_used: serde_json::Value) -> Self {
        Self {
            schema_hash,
            timestamp: unix_now(),
            ttl: ttl.as_secs(),
            result,
            config_used,
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.timestamp.saturating_add(self.ttl)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Schema-hash keyed cache with atomic get-or-compute.
pub struct DetectionCache<T> {
    entries: DashMap<String, Arc<OnceCell<CacheEntry<T>>>>,
    ttl: Duration,
    path: Option<PathBuf>,
}

impl<T> DetectionCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Create an empty in-memory cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            path: None,
        }
    }

    /// Open a file-backed cache, loading fresh entries if the file exists.
    ///
    /// Expired entries are dropped on load.
    pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> CacheResult<Self> {
        let path = path.into();
        let cache = Self {
            entries: DashMap::new(),
            ttl,
            path: Some(path.clone()),
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let stored: Vec<CacheEntry<T>> = serde_json::from_str(&content)?;
            let now = unix_now();
            for entry in stored.into_iter().filter(|e| !e.is_expired_at(now)) {
                let key = entry.schema_hash.clone();
                cache
                    .entries
                    .insert(key, Arc::new(OnceCell::new_with(Some(entry))));
            }
            tracing::debug!(path = %path.display(), entries = cache.entries.len(), "loaded detection cache");
        }

        Ok(cache)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn cell(&self, schema_hash: &str) -> Arc<OnceCell<CacheEntry<T>>> {
        self.entries
            .entry(schema_hash.to_string())
            .or_default()
            .clone()
    }

    /// Fresh cached result for a schema hash.
    pub fn get(&self, schema_hash: &str) -> Option<T> {
        let cell = self.entries.get(schema_hash)?.clone();
        cell.get()
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.result.clone())
    }

    /// Return the cached result, or compute and store it.
    ///
    /// Concurrent callers for the same hash wait for one computation. A
    /// failed computation stores nothing.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        schema_hash: &str,
        config_used: serde_json::Value,
        compute: F,
    ) -> Result<(T, CacheStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut cell = self.cell(schema_hash);
        if let Some(entry) = cell.get() {
            if !entry.is_expired() {
                return Ok((entry.result.clone(), CacheStatus::Hit));
            }
            tracing::debug!(schema_hash, "detection cache entry expired");
            self.entries
                .remove_if(schema_hash, |_, current| Arc::ptr_eq(current, &cell));
            cell = self.cell(schema_hash);
        }

        let computed = AtomicBool::new(false);
        let ttl = self.ttl;
        let entry = cell
            .get_or_try_init(|| {
                computed.store(true, Ordering::SeqCst);
                let pending = compute();
                let key = schema_hash.to_string();
                async move {
                    let result = pending.await?;
                    Ok::<_, E>(CacheEntry::new(key, ttl, result, config_used))
                }
            })
            .await?;

        let status = if computed.load(Ordering::SeqCst) {
            CacheStatus::Miss
        } else {
            CacheStatus::Hit
        };
        Ok((entry.result.clone(), status))
    }

    /// Drop the entry for a schema hash.
    pub fn invalidate(&self, schema_hash: &str) -> bool {
        self.entries.remove(schema_hash).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of computed entries (expired ones included until replaced).
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|item| item.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write fresh entries to the backing file, if any.
    pub async fn persist(&self) -> CacheResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let now = unix_now();
        let mut stored: Vec<CacheEntry<T>> = self
            .entries
            .iter()
            .filter_map(|item| item.value().get().cloned())
            .filter(|entry| !entry.is_expired_at(now))
            .collect();
        stored.sort_by(|a, b| a.schema_hash.cmp(&b.schema_hash));

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&stored)?;
        tokio::fs::write(path, json).await?;
        tracing::debug!(path = %path.display(), entries = stored.len(), "persisted detection cache");
        Ok(())
    }
}
