//! Cache backend trait and typed helpers.
//!
//! Backends store JSON values under string keys with an optional TTL. Reads
//! never fail: anything that prevents a value from being returned, including
//! a backend error or an expired entry, is reported as [`CacheLookup::Miss`].

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use helpsite_core::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheLookup::Miss)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheLookup<U> {
        match self {
            CacheLookup::Hit(value) => CacheLookup::Hit(f(value)),
            CacheLookup::Miss => CacheLookup::Miss,
        }
    }
}

impl<T> From<Option<T>> for CacheLookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => CacheLookup::Hit(value),
            None => CacheLookup::Miss,
        }
    }
}

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be interchangeable: callers only see JSON values,
/// hits and misses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name used in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Read a value. Never fails.
    async fn get(&self, key: &str) -> CacheLookup<Value>;

    /// Store a value. `None` keeps the entry until it is overwritten.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StorageError>;

    /// Remove a value, if present.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Get cache statistics.
    async fn stats(&self) -> CacheStats;
}

/// Typed access on top of any [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    /// Read and decode a value. A value that no longer decodes is a miss.
    async fn get_as<T>(&self, key: &str) -> CacheLookup<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await {
            CacheLookup::Hit(value) => match serde_json::from_value(value) {
                Ok(decoded) => CacheLookup::Hit(decoded),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    CacheLookup::Miss
                }
            },
            CacheLookup::Miss => CacheLookup::Miss,
        }
    }

    /// Encode and store a value.
    async fn set_as<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), StorageError>
    where
        T: Serialize + Sync,
    {
        let encoded = serde_json::to_value(value).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;
        self.set(key, encoded, ttl).await
    }

    /// Return the cached value for `key`, or compute it with `fetch` and cache it.
    ///
    /// A failure to store the computed value is logged and otherwise ignored.
    async fn read_through<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let CacheLookup::Hit(value) = self.get_as::<T>(key).await {
            tracing::debug!(key, backend = self.backend_name(), "Using cached value");
            return Ok(value);
        }

        tracing::debug!(key, backend = self.backend_name(), "Storing value in cache");
        let value = fetch().await?;
        if let Err(e) = self.set_as(key, &value, ttl).await {
            tracing::warn!(key, error = %e, "Failed to store value in cache");
        }
        Ok(value)
    }
}

impl<S: CacheStore + ?Sized> CacheStoreExt for S {}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries written.
    pub writes: u64,
    /// Number of backend failures swallowed as misses.
    pub errors: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_lookup_conversions() {
        let hit: CacheLookup<u8> = Some(3).into();
        assert!(hit.is_hit());
        assert_eq!(hit.map(|v| v * 2).into_option(), Some(6));

        let miss: CacheLookup<u8> = None.into();
        assert!(miss.is_miss());
    }
}
