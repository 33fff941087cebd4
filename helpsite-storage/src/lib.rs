//! Helpsite Storage
//!
//! Cache backends used for tokens, sessions, category lookups, labels and
//! the sitemap.

pub mod cache;

pub use cache::{
    CacheLookup, CacheStats, CacheStore, CacheStoreExt, InMemoryCacheBackend, LmdbCacheBackend,
    LmdbCacheError, RedisCacheBackend,
};
