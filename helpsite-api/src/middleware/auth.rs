//! Access token gate.
//!
//! Every page request needs a bearer token for the KM API. The token lives
//! in the shared cache under [`ACCESS_TOKEN_KEY`] and is:
//! - issued with the API key and secret when missing or expired
//! - refreshed when it expires within [`REFRESH_WINDOW_SECS`]
//! - reused otherwise
//!
//! The resolved [`KmCredentials`] are injected into the request extensions.
//!
//! [`REFRESH_WINDOW_SECS`]: helpsite_core::REFRESH_WINDOW_SECS

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use helpsite_core::{AccessToken, AuthApi, KmCredentials, TokenDecision};
use helpsite_storage::{CacheStore, CacheStoreExt};

use crate::config::HelpsiteConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::METRICS;

/// Cache key of the shared access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Suffix appended to the KM base URL handed out by the auth service.
const KM_API_VERSION: &str = "/v1";

/// Return a token valid for at least the refresh window, issuing or
/// refreshing it through `auth` as needed. The token is stored without TTL;
/// its own expiration governs reuse.
pub async fn resolve_access_token(
    cache: &dyn CacheStore,
    auth: &dyn AuthApi,
    config: &HelpsiteConfig,
    now: i64,
) -> ApiResult<AccessToken> {
    let cached = cache.get_as::<AccessToken>(ACCESS_TOKEN_KEY).await.into_option();
    let decision = TokenDecision::for_token(cached.as_ref(), now);

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_token_decision(decision.as_str());
    }

    let token = match (decision, cached) {
        (TokenDecision::Reuse, Some(token)) => return Ok(token),
        (TokenDecision::Refresh, Some(token)) => {
            tracing::debug!(seconds_left = token.seconds_left(now), "Refreshing access token");
            let refreshed = auth
                .refresh(&config.api_key, &token.access_token)
                .await
                .map_err(|e| {
                    ApiError::authentication_failed(format!("Failed to refresh access token: {}", e))
                })?;
            AccessToken {
                access_token: refreshed.access_token,
                expiration: refreshed.expiration,
                km_api_base_url: token.km_api_base_url,
            }
        }
        _ => {
            tracing::debug!("Requesting a new access token");
            let grant = auth
                .auth(&config.api_key, &config.api_secret)
                .await
                .map_err(|e| ApiError::authentication_failed(format!("Authentication failed: {}", e)))?;
            AccessToken {
                access_token: grant.access_token,
                expiration: grant.expiration,
                km_api_base_url: format!(
                    "{}{}",
                    grant.apis.knowledge.trim_end_matches('/'),
                    KM_API_VERSION
                ),
            }
        }
    };

    if let Err(e) = cache.set_as(ACCESS_TOKEN_KEY, &token, None).await {
        tracing::warn!(error = %e, "Failed to cache access token");
    }
    Ok(token)
}

/// KM credentials for `token` as configured for this deployment.
pub(crate) fn credentials_for(config: &HelpsiteConfig, token: &AccessToken) -> KmCredentials {
    KmCredentials {
        api_key: config.api_key.clone(),
        access_token: token.access_token.clone(),
        base_url: token.km_api_base_url.clone(),
        env: config.mode.as_str().to_string(),
        source: config.source.clone(),
        user_type: config.user_type,
        session_token: None,
    }
}

/// Axum middleware resolving the access token and injecting [`KmCredentials`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = resolve_access_token(
        state.cache.as_ref(),
        state.auth_api.as_ref(),
        &state.config,
        Utc::now().timestamp(),
    )
    .await?;

    request
        .extensions_mut()
        .insert(credentials_for(&state.config, &token));
    Ok(next.run(request).await)
}
