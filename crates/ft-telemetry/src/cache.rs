//! Latest-reading cache.
//!
//! Only atomic lookups are cached, one entry per `(device, type)` series.
//! Entries expire after the TTL given at `put` time. Misses are never stored,
//! so a reading that arrives after a miss is visible on the next call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use ft_common::{DataPointTypeId, DeviceId, Error, Reading, Result};

/// Cache key for the latest reading of one atomic series.
///
/// Renders as `device:{device}:datapoint:{type}:latest`, the key layout used
/// by shared key-value cache backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub device_id: DeviceId,
    pub type_id: DataPointTypeId,
}

impl CacheKey {
    pub fn latest(device_id: DeviceId, type_id: DataPointTypeId) -> Self {
        CacheKey { device_id, type_id }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device:{}:datapoint:{}:latest", self.device_id, self.type_id)
    }
}

/// Key-value cache with per-entry expiry.
pub trait ReadingCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<Reading>>;

    fn put(&self, key: CacheKey, reading: Reading, ttl: Duration) -> Result<()>;

    /// Drop the entry for `key`, if any.
    fn forget(&self, key: &CacheKey) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    reading: Reading,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Process-local cache guarded by a mutex. Expired entries are evicted
/// lazily on `get` or in bulk via [`MemoryCache::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".to_string()))
    }
}

impl ReadingCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Reading>> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.reading.clone())),
            None => Ok(None),
        }
    }

    fn put(&self, key: CacheKey, reading: Reading, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now().checked_add(ttl);
        self.lock()?.insert(key, CacheEntry { reading, expires_at });
        Ok(())
    }

    fn forget(&self, key: &CacheKey) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Cache that stores nothing. Used when caching is disabled in settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ReadingCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Result<Option<Reading>> {
        Ok(None)
    }

    fn put(&self, _key: CacheKey, _reading: Reading, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn forget(&self, _key: &CacheKey) -> Result<()> {
        Ok(())
    }
}
