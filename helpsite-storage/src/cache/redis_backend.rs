//! Redis-backed cache implementation.
//!
//! The network backend for deployments running more than one instance: every
//! instance sees the same token, session and category entries.

use std::time::Duration;

use async_trait::async_trait;
use helpsite_core::StorageError;
use redis::aio::ConnectionManager;
use redis::Client;
use serde_json::Value;

use super::traits::{CacheLookup, CacheStats, CacheStore, StatsRecorder};

/// Cache stored in Redis as JSON strings.
///
/// Keys are namespaced with a prefix so several helpsites can share one
/// Redis database.
pub struct RedisCacheBackend {
    connection: ConnectionManager,
    prefix: String,
    stats: StatsRecorder,
}

impl RedisCacheBackend {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StorageError> {
        let client = Client::open(url).map_err(|e| unavailable(e.to_string()))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        Ok(Self {
            connection,
            prefix: prefix.into(),
            stats: StatsRecorder::default(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        namespaced_key(&self.prefix, key)
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("prefix", &self.prefix)
            .finish()
    }
}

fn unavailable(reason: String) -> StorageError {
    StorageError::Unavailable {
        backend: "redis".to_string(),
        reason,
    }
}

fn failed(reason: String) -> StorageError {
    StorageError::OperationFailed {
        backend: "redis".to_string(),
        reason,
    }
}

fn namespaced_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", prefix, key)
    }
}

/// Expiry argument for `SET`, in whole seconds. Sub-second TTLs round up so
/// that a TTL never turns into "no expiry".
fn expiry_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}

#[async_trait]
impl CacheStore for RedisCacheBackend {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheLookup<Value> {
        let mut connection = self.connection.clone();
        let raw: Result<Option<String>, redis::RedisError> = redis::cmd("GET")
            .arg(self.namespaced(key))
            .query_async(&mut connection)
            .await;

        match raw {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    self.stats.hit();
                    CacheLookup::Hit(value)
                }
                Err(e) => {
                    self.stats.error();
                    self.stats.miss();
                    tracing::warn!(key, error = %e, "Redis cache entry is not valid JSON");
                    CacheLookup::Miss
                }
            },
            Ok(None) => {
                self.stats.miss();
                CacheLookup::Miss
            }
            Err(e) => {
                self.stats.error();
                self.stats.miss();
                tracing::warn!(key, error = %e, "Redis cache read failed, treating as miss");
                CacheLookup::Miss
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(&value).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;

        let mut command = redis::cmd("SET");
        command.arg(self.namespaced(key)).arg(encoded);
        if let Some(ttl) = ttl {
            command.arg("EX").arg(expiry_secs(ttl));
        }

        let mut connection = self.connection.clone();
        let _: () = command
            .query_async(&mut connection)
            .await
            .map_err(|e| failed(e.to_string()))?;
        self.stats.write();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(self.namespaced(key))
            .query_async(&mut connection)
            .await
            .map_err(|e| failed(e.to_string()))?;
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
