//! Auth API client: issues and refreshes KM bearer tokens.

use async_trait::async_trait;
use helpsite_core::{AuthApi, AuthGrant, RefreshedToken, UpstreamResult};
use reqwest::{Client, RequestBuilder};
use serde_json::json;

use super::{decode, send};

const API: &str = "auth";

/// Client for the Inbenta Auth API.
#[derive(Clone)]
pub struct AuthApiClient {
    http: Client,
    base_url: String,
}

impl AuthApiClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn auth_request(&self, api_key: &str, secret: &str) -> RequestBuilder {
        self.http
            .post(format!("{}/auth", self.base_url))
            .header("x-inbenta-key", api_key)
            .json(&json!({ "secret": secret }))
    }

    fn refresh_request(&self, api_key: &str, access_token: &str) -> RequestBuilder {
        self.http
            .post(format!("{}/refreshToken", self.base_url))
            .header("x-inbenta-key", api_key)
            .bearer_auth(access_token)
    }
}

#[async_trait]
impl AuthApi for AuthApiClient {
    async fn auth(&self, api_key: &str, secret: &str) -> UpstreamResult<AuthGrant> {
        let response = send(API, "auth", "/auth", self.auth_request(api_key, secret)).await?;
        decode(API, "/auth", response).await
    }

    async fn refresh(&self, api_key: &str, access_token: &str) -> UpstreamResult<RefreshedToken> {
        let request = self.refresh_request(api_key, access_token);
        let response = send(API, "refresh", "/refreshToken", request).await?;
        decode(API, "/refreshToken", response).await
    }
}

impl std::fmt::Debug for AuthApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AuthApiClient {
        AuthApiClient::new(Client::new(), "https://auth.test/v1/")
    }

    #[test]
    fn test_auth_request_shape() {
        let request = client()
            .auth_request("key-1", "s3cret")
            .build()
            .expect("request should build");

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "https://auth.test/v1/auth");
        assert_eq!(request.headers()["x-inbenta-key"], "key-1");

        let body = request
            .body()
            .and_then(|body| body.as_bytes())
            .expect("body should be buffered");
        let body: serde_json::Value = serde_json::from_slice(body).expect("body should be JSON");
        assert_eq!(body, json!({"secret": "s3cret"}));
    }

    #[test]
    fn test_refresh_request_carries_bearer_token() {
        let request = client()
            .refresh_request("key-1", "token-1")
            .build()
            .expect("request should build");

        assert_eq!(request.url().as_str(), "https://auth.test/v1/refreshToken");
        assert_eq!(request.headers()["authorization"], "Bearer token-1");
        assert_eq!(request.headers()["x-inbenta-key"], "key-1");
    }
}
