//! Tracing Subscriber Initialization
//!
//! JSON lines outside development so log shippers can parse them, readable
//! text locally. Filtering follows `RUST_LOG` when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "helpsite_api=debug,tower_http=debug,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, preproduction, development)
    pub environment: String,
    /// Emit JSON lines instead of human-readable text
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let environment =
            std::env::var("HELPSITE_ENV").unwrap_or_else(|_| "development".to_string());
        let json_logs = std::env::var("HELPSITE_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(environment != "development");

        Self {
            service_name: std::env::var("HELPSITE_SERVICE_NAME")
                .unwrap_or_else(|_| "helpsite-api".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
            json_logs,
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Must be called once, before the first log line.
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json_layer = config
        .json_logs
        .then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!config.json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        service_version = config.service_version,
        environment = config.environment,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(())
}
