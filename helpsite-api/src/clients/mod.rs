//! HTTP clients for the upstream Inbenta APIs.
//!
//! Both clients share one `reqwest::Client` and the same request plumbing:
//! every call is timed, counted, and mapped onto [`UpstreamError`].

pub mod auth;
pub mod km;

use std::time::{Duration, Instant};

use helpsite_core::{UpstreamError, UpstreamResult};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::{ApiError, ApiResult};
use crate::telemetry::METRICS;

pub use auth::AuthApiClient;
pub use km::{KmApiClient, KmApiClientFactory};

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Build the HTTP client shared by the upstream clients.
pub fn build_http_client(timeout: Duration) -> ApiResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .user_agent(concat!("helpsite/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))
}

/// `{"results": [...]}` wrapper used by most KM endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Send a request and return the response if the upstream answered 2xx.
///
/// A 404 becomes [`UpstreamError::NotFound`] so that page handlers can
/// answer with their own not-found page.
pub(crate) async fn send(
    api: &str,
    operation: &str,
    endpoint: &str,
    request: RequestBuilder,
) -> UpstreamResult<Response> {
    let start = Instant::now();
    let result = request.send().await;
    let elapsed = start.elapsed().as_secs_f64();

    let outcome = match &result {
        Ok(response) if response.status().is_success() => "success",
        Ok(response) if response.status() == StatusCode::NOT_FOUND => "not_found",
        Ok(_) => "error",
        Err(_) => "transport_error",
    };
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_upstream_call(api, operation, outcome, elapsed);
    }

    let response = result.map_err(|e| {
        tracing::warn!(api, endpoint, error = %e, "Upstream request failed");
        UpstreamError::Transport {
            api: api.to_string(),
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    })?;

    let status = response.status();
    tracing::debug!(api, endpoint, status = status.as_u16(), elapsed_ms = (elapsed * 1000.0) as u64, "Upstream response");

    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(UpstreamError::NotFound {
            api: api.to_string(),
            endpoint: endpoint.to_string(),
        });
    }

    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    Err(UpstreamError::Status {
        api: api.to_string(),
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Decode a JSON response body.
pub(crate) async fn decode<T: DeserializeOwned>(
    api: &str,
    endpoint: &str,
    response: Response,
) -> UpstreamResult<T> {
    let bytes = response.bytes().await.map_err(|e| UpstreamError::Transport {
        api: api.to_string(),
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| UpstreamError::InvalidResponse {
        api: api.to_string(),
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}
