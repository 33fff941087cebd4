//! KM API client.
//!
//! One [`KmApiClient`] is bound to the credentials resolved for the current
//! request; [`KmApiClientFactory`] hands them out and shares the underlying
//! HTTP connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use helpsite_core::{
    Category, Content, ContentPage, KmCredentials, KnowledgeApi, KnowledgeApiFactory,
    SearchResults, TrackingEvent, UpstreamResult,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{decode, send, Envelope};

const API: &str = "km";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_token: String,
}

fn max_depth_query(max_depth: Option<i32>) -> String {
    max_depth
        .map(|depth| format!("?maxDepth={}", depth))
        .unwrap_or_default()
}

/// KM API client bound to one set of credentials.
#[derive(Clone)]
pub struct KmApiClient {
    http: Client,
    credentials: KmCredentials,
}

impl KmApiClient {
    pub fn new(http: Client, credentials: KmCredentials) -> Self {
        Self { http, credentials }
    }

    pub fn credentials(&self) -> &KmCredentials {
        &self.credentials
    }

    /// Request to `endpoint` with every header the KM API expects.
    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let credentials = &self.credentials;
        let url = format!("{}{}", credentials.base_url.trim_end_matches('/'), endpoint);

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&credentials.access_token)
            .header("x-inbenta-key", &credentials.api_key)
            .header("x-inbenta-env", &credentials.env)
            .header("x-inbenta-user-type", credentials.user_type.to_string());
        if let Some(source) = &credentials.source {
            request = request.header("x-inbenta-source", source);
        }
        if let Some(session_token) = &credentials.session_token {
            request = request.header("x-inbenta-session", session_token);
        }
        request
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        endpoint: &str,
    ) -> UpstreamResult<T> {
        let response = send(API, operation, endpoint, self.request(Method::GET, endpoint)).await?;
        decode(API, endpoint, response).await
    }

    async fn get_results<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        endpoint: &str,
    ) -> UpstreamResult<Vec<T>> {
        let envelope: Envelope<T> = self.get(operation, endpoint).await?;
        Ok(envelope.results)
    }

    async fn post(&self, operation: &str, endpoint: &str, body: &Value) -> UpstreamResult<reqwest::Response> {
        let request = self.request(Method::POST, endpoint).json(body);
        send(API, operation, endpoint, request).await
    }
}

#[async_trait]
impl KnowledgeApi for KmApiClient {
    async fn autocomplete(&self, query: &str) -> UpstreamResult<Vec<Content>> {
        let body = json!({
            "type": "instant",
            "splitQuery": true,
            "tracking": false,
            "query": query,
        });
        let response = self.post("autocomplete", "/search", &body).await?;
        let envelope: Envelope<Content> = decode(API, "/search", response).await?;
        Ok(envelope.results)
    }

    async fn search(&self, query: &str) -> UpstreamResult<SearchResults> {
        let response = self.post("search", "/search", &json!({ "query": query })).await?;
        decode(API, "/search", response).await
    }

    async fn popular(&self, length: usize) -> UpstreamResult<Vec<Content>> {
        self.get_results("popular", &format!("/contents/popular?length={}", length))
            .await
    }

    async fn contents(&self, length: usize, offset: usize) -> UpstreamResult<ContentPage> {
        self.get("contents", &format!("/contents?length={}&offset={}", length, offset))
            .await
    }

    async fn content_by_slug(
        &self,
        slug: &str,
        tracking: Option<bool>,
    ) -> UpstreamResult<Vec<Content>> {
        let mut endpoint = format!("/contents/slug/{}", urlencoding::encode(slug));
        if let Some(tracking) = tracking {
            endpoint.push_str(if tracking { "?tracking=1" } else { "?tracking=0" });
        }
        self.get_results("content_by_slug", &endpoint).await
    }

    async fn category_by_id(
        &self,
        id: i64,
        max_depth: Option<i32>,
    ) -> UpstreamResult<Vec<Category>> {
        let endpoint = format!("/categories/{}{}", id, max_depth_query(max_depth));
        self.get_results("category_by_id", &endpoint).await
    }

    async fn category_by_slug(
        &self,
        slug: &str,
        max_depth: Option<i32>,
    ) -> UpstreamResult<Vec<Category>> {
        let endpoint = format!(
            "/categories/slug/{}{}",
            urlencoding::encode(slug),
            max_depth_query(max_depth)
        );
        self.get_results("category_by_slug", &endpoint).await
    }

    async fn categories(&self, max_depth: Option<i32>) -> UpstreamResult<Vec<Category>> {
        let endpoint = format!("/categories/{}", max_depth_query(max_depth));
        self.get_results("categories", &endpoint).await
    }

    async fn category_contents(&self, id: i64) -> UpstreamResult<Vec<Content>> {
        self.get_results("category_contents", &format!("/categories/{}/contents", id))
            .await
    }

    async fn related_contents(&self, id: i64) -> UpstreamResult<Vec<Content>> {
        self.get_results("related_contents", &format!("/contents/{}/related", id))
            .await
    }

    async fn track(&self, event: &TrackingEvent) -> UpstreamResult<()> {
        let body = serde_json::to_value(event).map_err(|e| helpsite_core::UpstreamError::InvalidResponse {
            api: API.to_string(),
            endpoint: "/tracking/events/".to_string(),
            reason: e.to_string(),
        })?;
        self.post("track", "/tracking/events/", &body).await?;
        Ok(())
    }

    async fn app_data(&self, data_id: &str, name: Option<&str>) -> UpstreamResult<Value> {
        let mut endpoint = format!("/app/data/{}", urlencoding::encode(data_id));
        if let Some(name) = name {
            endpoint.push_str(&format!("?name={}", urlencoding::encode(name)));
        }
        self.get("app_data", &endpoint).await
    }

    async fn create_session(&self) -> UpstreamResult<String> {
        let response = self
            .post("create_session", "/tracking/session", &json!({}))
            .await?;
        let session: SessionResponse = decode(API, "/tracking/session", response).await?;
        Ok(session.session_token)
    }

    async fn track_user_info(&self, data: Value) -> UpstreamResult<()> {
        self.post("track_user_info", "/tracking/session/user", &data)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for KmApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmApiClient")
            .field("base_url", &self.credentials.base_url)
            .field("env", &self.credentials.env)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Hands out [`KmApiClient`]s sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct KmApiClientFactory {
    http: Client,
}

impl KmApiClientFactory {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl KnowledgeApiFactory for KmApiClientFactory {
    fn connect(&self, credentials: KmCredentials) -> Arc<dyn KnowledgeApi> {
        Arc::new(KmApiClient::new(self.http.clone(), credentials))
    }
}
