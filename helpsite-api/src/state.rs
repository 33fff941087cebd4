//! Shared application state for Axum routers.

use std::sync::Arc;

use helpsite_core::{AuthApi, KnowledgeApiFactory};
use helpsite_storage::{CacheStore, InMemoryCacheBackend, LmdbCacheBackend, RedisCacheBackend};

use crate::clients::{build_http_client, AuthApiClient, KmApiClientFactory};
use crate::config::{CacheBackendKind, HelpsiteConfig};
use crate::error::{ApiError, ApiResult};
use crate::locale::LocaleBundle;

/// Application-wide state shared across all routes.
///
/// Every service is injected here; nothing is reached through globals, so
/// tests can swap the upstream APIs and the cache for in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HelpsiteConfig>,
    /// Backs the access token, sessions and cached page data.
    pub cache: Arc<dyn CacheStore>,
    pub auth_api: Arc<dyn AuthApi>,
    /// Builds a KM client per request, once credentials are resolved.
    pub km: Arc<dyn KnowledgeApiFactory>,
    pub locale: Arc<LocaleBundle>,
}

impl AppState {
    pub fn new(
        config: HelpsiteConfig,
        cache: Arc<dyn CacheStore>,
        auth_api: Arc<dyn AuthApi>,
        km: Arc<dyn KnowledgeApiFactory>,
        locale: LocaleBundle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            auth_api,
            km,
            locale: Arc::new(locale),
        }
    }

    /// Wire the production services described by `config`.
    pub async fn from_config(config: HelpsiteConfig) -> ApiResult<Self> {
        let http = build_http_client(config.http_timeout)?;
        let cache = open_cache(&config).await?;
        let locale = LocaleBundle::load(&config.lang, config.locale_dir.as_deref())?;
        let auth_api = Arc::new(AuthApiClient::new(http.clone(), config.auth_url.clone()));
        let km = Arc::new(KmApiClientFactory::new(http));

        tracing::info!(
            mode = %config.mode,
            cache_backend = cache.backend_name(),
            lang = %config.lang,
            "Application state initialized"
        );
        Ok(Self::new(config, cache, auth_api, km, locale))
    }
}

/// Open the cache backend selected in the configuration.
pub async fn open_cache(config: &HelpsiteConfig) -> ApiResult<Arc<dyn CacheStore>> {
    let cache: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackendKind::Lmdb => Arc::new(
            LmdbCacheBackend::new(&config.cache_path, config.cache_max_size_mb).map_err(|e| {
                ApiError::cache_error(format!(
                    "Failed to open LMDB cache at {}: {}",
                    config.cache_path.display(),
                    e
                ))
            })?,
        ),
        CacheBackendKind::Redis => {
            Arc::new(RedisCacheBackend::connect(&config.redis_url, "helpsite").await?)
        }
        CacheBackendKind::Memory => Arc::new(InMemoryCacheBackend::new()),
    };
    Ok(cache)
}

// Use macro to reduce boilerplate for FromRef implementations
crate::impl_from_ref!(Arc<HelpsiteConfig>, config);
crate::impl_from_ref!(Arc<dyn CacheStore>, cache);
crate::impl_from_ref!(Arc<dyn AuthApi>, auth_api);
crate::impl_from_ref!(Arc<dyn KnowledgeApiFactory>, km);
crate::impl_from_ref!(Arc<LocaleBundle>, locale);
