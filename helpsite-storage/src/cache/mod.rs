//! Key-value cache with interchangeable backends.
//!
//! Page handlers talk to a `dyn CacheStore` and never learn which backend
//! is active:
//!
//! - [`RedisCacheBackend`]: network cache shared by every instance
//! - [`LmdbCacheBackend`]: file-backed cache for a single host
//! - [`InMemoryCacheBackend`]: process-local map for tests
//!
//! A read never fails. Backend errors, expired entries and undecodable
//! values all come back as [`CacheLookup::Miss`].

pub mod lmdb_backend;
pub mod memory_backend;
pub mod redis_backend;
pub mod traits;

pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory_backend::InMemoryCacheBackend;
pub use redis_backend::RedisCacheBackend;
pub use traits::{CacheLookup, CacheStats, CacheStore, CacheStoreExt};
