//! In-process cache backend.
//!
//! Used by tests and by single-process development runs that do not want
//! anything written to disk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use helpsite_core::StorageError;
use serde_json::Value;

use super::traits::{CacheLookup, CacheStats, CacheStore, StatsRecorder};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Writes between two sweeps of expired entries.
const SWEEP_EVERY: u64 = 64;

/// Cache backed by a concurrent hash map.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: DashMap<String, MemoryEntry>,
    stats: StatsRecorder,
    writes: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until they are swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheLookup<Value> {
        let now = Instant::now();
        let found = self
            .entries
            .get(key)
            .map(|entry| (entry.is_expired(now), entry.value.clone()));

        match found {
            Some((false, value)) => {
                self.stats.hit();
                CacheLookup::Hit(value)
            }
            Some((true, _)) => {
                self.entries.remove(key);
                self.stats.miss();
                CacheLookup::Miss
            }
            None => {
                self.stats.miss();
                CacheLookup::Miss
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StorageError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), MemoryEntry { value, expires_at });
        self.stats.write();

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            let removed = self.cleanup_expired();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired cache entries");
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStoreExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let cache = InMemoryCacheBackend::new();
        cache
            .set("labels", json!({"HOME": "Home"}), Some(Duration::from_secs(1800)))
            .await
            .expect("set should succeed");

        assert_eq!(
            cache.get("labels").await,
            CacheLookup::Hit(json!({"HOME": "Home"}))
        );
    }

    #[tokio::test]
    async fn test_unset_key_is_miss() {
        let cache = InMemoryCacheBackend::new();
        assert_eq!(cache.get("never-set").await, CacheLookup::Miss);
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let cache = InMemoryCacheBackend::new();
        cache
            .set("short", json!(1), Some(Duration::ZERO))
            .await
            .expect("set should succeed");

        assert_eq!(cache.get("short").await, CacheLookup::Miss);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_writes_sweep_unread_expired_entries() {
        let cache = InMemoryCacheBackend::new();
        cache
            .set("category_unread", json!(1), Some(Duration::ZERO))
            .await
            .expect("set should succeed");
        cache
            .set("sitemap", json!([]), None)
            .await
            .expect("set should succeed");

        for i in 2..SWEEP_EVERY {
            cache
                .set(&format!("live-{}", i), json!(i), Some(Duration::from_secs(1800)))
                .await
                .expect("set should succeed");
        }

        assert_eq!(cache.len(), SWEEP_EVERY as usize - 1);
        assert!(cache.get("sitemap").await.is_hit());
    }

    #[tokio::test]
    async fn test_cleanup_expired_keeps_live_entries() {
        let cache = InMemoryCacheBackend::new();
        cache
            .set("gone", json!(1), Some(Duration::ZERO))
            .await
            .expect("set should succeed");
        cache
            .set("kept", json!(2), Some(Duration::from_secs(1800)))
            .await
            .expect("set should succeed");

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("kept").await, CacheLookup::Hit(json!(2)));
    }

    #[tokio::test]
    async fn test_read_through_fetches_once() {
        let cache = InMemoryCacheBackend::new();
        let first: Result<Vec<u32>, String> = cache
            .read_through("numbers", None, || async { Ok(vec![1, 2, 3]) })
            .await;
        assert_eq!(first, Ok(vec![1, 2, 3]));

        let second: Result<Vec<u32>, String> = cache
            .read_through("numbers", None, || async {
                Err("fetch should not run on a hit".to_string())
            })
            .await;
        assert_eq!(second, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_read_through_propagates_fetch_error_without_caching() {
        let cache = InMemoryCacheBackend::new();
        let result: Result<u32, String> = cache
            .read_through("broken", None, || async { Err("upstream down".to_string()) })
            .await;
        assert_eq!(result, Err("upstream down".to_string()));
        assert!(cache.get("broken").await.is_miss());
    }
}
