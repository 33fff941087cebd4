//! Helpsite Configuration Module
//!
//! Configuration is loaded from environment variables. Everything except the
//! API credentials has a default suited to local development.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use helpsite_core::ConfigError;

// ============================================================================
// MODE
// ============================================================================

/// Deployment mode, sent upstream as `x-inbenta-env`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Development,
    Preproduction,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Preproduction => "preproduction",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "preproduction" | "preprod" => Ok(Mode::Preproduction),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

// ============================================================================
// CACHE BACKEND
// ============================================================================

/// Which key-value cache backs tokens, sessions and page data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Local file store (LMDB), for single-instance deployments.
    Lmdb,
    /// Redis, shared by every instance.
    Redis,
    /// Process memory; nothing survives a restart.
    Memory,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "lmdb" | "file" => Ok(CacheBackendKind::Lmdb),
            "redis" => Ok(CacheBackendKind::Redis),
            "memory" => Ok(CacheBackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

// ============================================================================
// HELPSITE CONFIGURATION
// ============================================================================

/// Runtime configuration of the helpsite.
#[derive(Debug, Clone)]
pub struct HelpsiteConfig {
    pub mode: Mode,

    // ========================================================================
    // Upstream APIs
    // ========================================================================
    /// Inbenta API key.
    pub api_key: String,
    /// Inbenta API secret.
    pub api_secret: String,
    /// Auth API base URL.
    pub auth_url: String,
    /// Timeout applied to connecting and to reading each upstream response.
    pub http_timeout: Duration,
    /// User type contents are retrieved for.
    pub user_type: i64,
    /// Source tag attached to tracked events, if any.
    pub source: Option<String>,

    // ========================================================================
    // Localisation
    // ========================================================================
    pub lang: String,
    /// Directory holding `{lang}/labels.json` and `{lang}/categories.json`.
    /// The bundled English locale is used when unset.
    pub locale_dir: Option<PathBuf>,

    // ========================================================================
    // Cache
    // ========================================================================
    pub cache_backend: CacheBackendKind,
    /// LMDB directory.
    pub cache_path: PathBuf,
    pub cache_max_size_mb: usize,
    pub redis_url: String,
    /// Lifetime of cached categories, labels and category metadata.
    pub cache_ttl: Duration,
    /// Lifetime of an idle visitor session.
    pub session_ttl: Duration,

    // ========================================================================
    // Display
    // ========================================================================
    pub categories_per_line: usize,
    pub popular_length: usize,
    pub sitemap_page_length: usize,
    /// Fixed base URL. Derived from request headers when unset.
    pub base_url: Option<String>,
    /// Whether robots may index the site.
    pub allow_indexing: bool,
}

impl Default for HelpsiteConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Development,
            api_key: String::new(),
            api_secret: String::new(),
            auth_url: "https://api.inbenta.io/v1".to_string(),
            http_timeout: Duration::from_secs(3),
            user_type: 0,
            source: Some("km_debug".to_string()),
            lang: "en".to_string(),
            locale_dir: None,
            cache_backend: CacheBackendKind::Memory,
            cache_path: PathBuf::from("/tmp/helpsite-cache"),
            cache_max_size_mb: 64,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            cache_ttl: Duration::from_secs(1800),
            session_ttl: Duration::from_secs(1800),
            categories_per_line: 5,
            popular_length: 3,
            sitemap_page_length: 100,
            base_url: None,
            allow_indexing: false,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(name: &str) -> Result<String, ConfigError> {
    env_var(name).ok_or_else(|| ConfigError::MissingRequired {
        field: name.to_string(),
    })
}

fn parsed<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: name.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn positive(name: &str, default: usize) -> Result<usize, ConfigError> {
    let value = parsed(name, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: name.to_string(),
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

impl HelpsiteConfig {
    /// Create HelpsiteConfig from environment variables.
    ///
    /// Environment variables:
    /// - `HELPSITE_ENV`: development, preproduction or production (default: development)
    /// - `INBENTA_API_KEY`, `INBENTA_API_SECRET`: API credentials (required)
    /// - `INBENTA_AUTH_URL`: Auth API base URL (default: https://api.inbenta.io/v1)
    /// - `HELPSITE_HTTP_TIMEOUT_SECS`: upstream connect/read timeout (default: 3)
    /// - `HELPSITE_USER_TYPE`: KM user type (default: 0)
    /// - `HELPSITE_SOURCE`: event source (default: km_debug in development, none otherwise)
    /// - `HELPSITE_LANG`: locale (default: en)
    /// - `HELPSITE_LOCALE_DIR`: locale directory (default: bundled locale)
    /// - `HELPSITE_CACHE_BACKEND`: lmdb, redis or memory (default: lmdb in development, redis otherwise)
    /// - `HELPSITE_CACHE_PATH`: LMDB directory (default: /tmp/helpsite-cache)
    /// - `HELPSITE_CACHE_MAX_SIZE_MB`: LMDB map size (default: 64)
    /// - `HELPSITE_REDIS_URL` or `REDIS_URL`: Redis URL (default: redis://127.0.0.1:6379)
    /// - `HELPSITE_CACHE_TTL_SECS`: page data cache lifetime (default: 1800)
    /// - `HELPSITE_SESSION_TTL_SECS`: session lifetime (default: 1800)
    /// - `HELPSITE_CATEGORIES_PER_LINE`: category grid width (default: 5)
    /// - `HELPSITE_POPULAR_LENGTH`: popular contents shown (default: 3)
    /// - `HELPSITE_SITEMAP_PAGE_LENGTH`: contents fetched per sitemap page (default: 100)
    /// - `HELPSITE_BASE_URL`: fixed public base URL (default: derived per request)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mode: Mode = parsed("HELPSITE_ENV", Mode::Development)?;

        let default_backend = match mode {
            Mode::Development => CacheBackendKind::Lmdb,
            _ => CacheBackendKind::Redis,
        };
        let source = match env_var("HELPSITE_SOURCE") {
            Some(source) => Some(source),
            None if mode == Mode::Development => Some("km_debug".to_string()),
            None => None,
        };

        Ok(Self {
            mode,
            api_key: required("INBENTA_API_KEY")?,
            api_secret: required("INBENTA_API_SECRET")?,
            auth_url: env_var("INBENTA_AUTH_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.auth_url),
            http_timeout: Duration::from_secs(parsed("HELPSITE_HTTP_TIMEOUT_SECS", 3)?),
            user_type: parsed("HELPSITE_USER_TYPE", defaults.user_type)?,
            source,
            lang: env_var("HELPSITE_LANG").unwrap_or(defaults.lang),
            locale_dir: env_var("HELPSITE_LOCALE_DIR").map(PathBuf::from),
            cache_backend: parsed("HELPSITE_CACHE_BACKEND", default_backend)?,
            cache_path: env_var("HELPSITE_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            cache_max_size_mb: positive("HELPSITE_CACHE_MAX_SIZE_MB", defaults.cache_max_size_mb)?,
            redis_url: env_var("HELPSITE_REDIS_URL")
                .or_else(|| env_var("REDIS_URL"))
                .unwrap_or(defaults.redis_url),
            cache_ttl: Duration::from_secs(parsed("HELPSITE_CACHE_TTL_SECS", 1800)?),
            session_ttl: Duration::from_secs(parsed("HELPSITE_SESSION_TTL_SECS", 1800)?),
            categories_per_line: positive(
                "HELPSITE_CATEGORIES_PER_LINE",
                defaults.categories_per_line,
            )?,
            popular_length: parsed("HELPSITE_POPULAR_LENGTH", defaults.popular_length)?,
            sitemap_page_length: positive(
                "HELPSITE_SITEMAP_PAGE_LENGTH",
                defaults.sitemap_page_length,
            )?,
            base_url: env_var("HELPSITE_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
            allow_indexing: mode == Mode::Production,
        })
    }

    pub fn is_production(&self) -> bool {
        self.mode == Mode::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-wide; tests touching them run one at a time.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn clean_env() -> Vec<EnvVarGuard> {
        [
            "HELPSITE_ENV",
            "HELPSITE_SOURCE",
            "HELPSITE_CACHE_BACKEND",
            "HELPSITE_CATEGORIES_PER_LINE",
            "HELPSITE_BASE_URL",
            "HELPSITE_REDIS_URL",
            "REDIS_URL",
        ]
        .into_iter()
        .map(|key| EnvVarGuard::set(key, None))
        .collect()
    }

    #[test]
    fn test_default_config() {
        let config = HelpsiteConfig::default();
        assert_eq!(config.mode, Mode::Development);
        assert_eq!(config.cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.categories_per_line, 5);
        assert_eq!(config.popular_length, 3);
        assert_eq!(config.sitemap_page_length, 100);
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert!(!config.allow_indexing);
    }

    #[test]
    fn test_missing_credentials_are_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = clean_env();
        let _key = EnvVarGuard::set("INBENTA_API_KEY", None);
        let _secret = EnvVarGuard::set("INBENTA_API_SECRET", Some("secret"));

        let err = HelpsiteConfig::from_env().expect_err("missing key should fail");
        assert_eq!(
            err,
            ConfigError::MissingRequired {
                field: "INBENTA_API_KEY".to_string()
            }
        );
    }

    #[test]
    fn test_development_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = clean_env();
        let _key = EnvVarGuard::set("INBENTA_API_KEY", Some("key"));
        let _secret = EnvVarGuard::set("INBENTA_API_SECRET", Some("secret"));

        let config = HelpsiteConfig::from_env().expect("config should load");
        assert_eq!(config.mode, Mode::Development);
        assert_eq!(config.cache_backend, CacheBackendKind::Lmdb);
        assert_eq!(config.source.as_deref(), Some("km_debug"));
        assert!(!config.allow_indexing);
    }

    #[test]
    fn test_production_mode() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = clean_env();
        let _key = EnvVarGuard::set("INBENTA_API_KEY", Some("key"));
        let _secret = EnvVarGuard::set("INBENTA_API_SECRET", Some("secret"));
        let _mode = EnvVarGuard::set("HELPSITE_ENV", Some("production"));
        let _redis = EnvVarGuard::set("REDIS_URL", Some("redis://cache:6379/1"));
        let _base = EnvVarGuard::set("HELPSITE_BASE_URL", Some("https://help.example.com/"));

        let config = HelpsiteConfig::from_env().expect("config should load");
        assert!(config.is_production());
        assert!(config.allow_indexing);
        assert_eq!(config.cache_backend, CacheBackendKind::Redis);
        assert_eq!(config.redis_url, "redis://cache:6379/1");
        assert_eq!(config.source, None);
        assert_eq!(config.base_url.as_deref(), Some("https://help.example.com"));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = clean_env();
        let _key = EnvVarGuard::set("INBENTA_API_KEY", Some("key"));
        let _secret = EnvVarGuard::set("INBENTA_API_SECRET", Some("secret"));
        let _per_line = EnvVarGuard::set("HELPSITE_CATEGORIES_PER_LINE", Some("0"));

        let err = HelpsiteConfig::from_env().expect_err("zero per line should fail");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "HELPSITE_CATEGORIES_PER_LINE"));

        let _per_line = EnvVarGuard::set("HELPSITE_CATEGORIES_PER_LINE", Some("4"));
        let _backend = EnvVarGuard::set("HELPSITE_CACHE_BACKEND", Some("memcached"));
        let err = HelpsiteConfig::from_env().expect_err("unknown backend should fail");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "HELPSITE_CACHE_BACKEND"));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Production".parse::<Mode>(), Ok(Mode::Production));
        assert_eq!("preprod".parse::<Mode>(), Ok(Mode::Preproduction));
        assert!("staging".parse::<Mode>().is_err());
        assert_eq!(Mode::Preproduction.to_string(), "preproduction");
    }
}
