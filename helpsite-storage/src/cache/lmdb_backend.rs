//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a single-host,
//! file-backed key-value store. This is the backend for development and
//! single-instance deployments: the data survives restarts and needs no
//! external service.
//!
//! # Record Format
//!
//! `[expires_at: 8 bytes, little-endian unix millis, 0 = never][json value]`
//!
//! A read that finds an expired record removes it. Every `SWEEP_EVERY`
//! writes, all expired records are removed, so keys that are never read
//! again do not stay on disk.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use helpsite_core::StorageError;
use serde_json::Value;

use super::traits::{CacheLookup, CacheStats, CacheStore, StatsRecorder};

const HEADER_LEN: usize = 8;
const NO_EXPIRY: i64 = 0;
/// Writes between two sweeps of expired records.
const SWEEP_EVERY: u64 = 256;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored record could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for StorageError {
    fn from(e: LmdbCacheError) -> Self {
        StorageError::OperationFailed {
            backend: "lmdb".to_string(),
            reason: e.to_string(),
        }
    }
}

/// LMDB-backed cache.
///
/// # Example
///
/// ```ignore
/// use helpsite_storage::cache::{CacheStore, LmdbCacheBackend};
///
/// let backend = LmdbCacheBackend::new("/tmp/helpsite-cache", 64)?;
/// backend.set("labels", serde_json::json!({}), None).await?;
/// let cached = backend.get("labels").await;
/// ```
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    stats: StatsRecorder,
    writes: AtomicU64,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this process; no other
        // handle to the same files is opened with different flags.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            stats: StatsRecorder::default(),
            writes: AtomicU64::new(0),
        })
    }

    fn encode(value: &Value, ttl: Option<Duration>) -> Result<Vec<u8>, StorageError> {
        let expires_at = match ttl {
            Some(ttl) => {
                let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                Utc::now().timestamp_millis().saturating_add(ttl_millis)
            }
            None => NO_EXPIRY,
        };
        let value_bytes = serde_json::to_vec(value).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;

        let mut full_bytes = Vec::with_capacity(HEADER_LEN + value_bytes.len());
        full_bytes.extend_from_slice(&expires_at.to_le_bytes());
        full_bytes.extend_from_slice(&value_bytes);
        Ok(full_bytes)
    }

    fn expires_at(bytes: &[u8]) -> Result<i64, LmdbCacheError> {
        let header: [u8; HEADER_LEN] = bytes
            .get(0..HEADER_LEN)
            .ok_or_else(|| LmdbCacheError::Corrupt("record shorter than header".into()))?
            .try_into()
            .map_err(|_| LmdbCacheError::Corrupt("invalid expiry header".into()))?;
        Ok(i64::from_le_bytes(header))
    }

    fn is_expired(expires_at: i64, now_millis: i64) -> bool {
        expires_at != NO_EXPIRY && expires_at <= now_millis
    }

    /// Decode a record; `Ok(None)` means the record has expired.
    fn decode(bytes: &[u8], now_millis: i64) -> Result<Option<Value>, LmdbCacheError> {
        if Self::is_expired(Self::expires_at(bytes)?, now_millis) {
            return Ok(None);
        }

        serde_json::from_slice(&bytes[HEADER_LEN..])
            .map(Some)
            .map_err(|e| LmdbCacheError::Corrupt(e.to_string()))
    }

    fn read(&self, key: &str) -> Result<Option<Value>, LmdbCacheError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let found = self
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        match found {
            Some(bytes) => {
                let decoded = Self::decode(bytes, Utc::now().timestamp_millis())?;
                if decoded.is_none() {
                    drop(rtxn);
                    self.remove(key)?;
                }
                Ok(decoded)
            }
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key.as_bytes(), bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(deleted)
    }

    /// Remove every expired record. Returns how many were removed.
    ///
    /// Corrupt records are left for the read path to report.
    pub fn cleanup_expired(&self) -> Result<usize, LmdbCacheError> {
        let now_millis = Utc::now().timestamp_millis();
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let expired: Vec<Vec<u8>> = {
            let iter = self
                .db
                .iter(&wtxn)
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            let mut expired = Vec::new();
            for entry in iter {
                let (key, bytes) = entry.map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
                if let Ok(expires_at) = Self::expires_at(bytes) {
                    if Self::is_expired(expires_at, now_millis) {
                        expired.push(key.to_vec());
                    }
                }
            }
            expired
        };

        for key in &expired {
            self.db
                .delete(&mut wtxn, key)
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        }

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(expired.len())
    }
}

#[async_trait]
impl CacheStore for LmdbCacheBackend {
    fn backend_name(&self) -> &'static str {
        "lmdb"
    }

    async fn get(&self, key: &str) -> CacheLookup<Value> {
        match self.read(key) {
            Ok(Some(value)) => {
                self.stats.hit();
                CacheLookup::Hit(value)
            }
            Ok(None) => {
                self.stats.miss();
                CacheLookup::Miss
            }
            Err(e) => {
                self.stats.error();
                self.stats.miss();
                tracing::warn!(key, error = %e, "LMDB cache read failed, treating as miss");
                CacheLookup::Miss
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StorageError> {
        let bytes = Self::encode(&value, ttl)?;
        self.write(key, &bytes)?;
        self.stats.write();

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            match self.cleanup_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Swept expired LMDB records"),
                Err(e) => tracing::warn!(error = %e, "LMDB expiry sweep failed"),
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.remove(key)?;
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
