//! Upstream API traits.
//!
//! The auth service and the KM API sit behind these traits so that page
//! handlers can be driven by in-memory doubles. HTTP implementations live in
//! the API crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::Category;
use crate::content::{Content, ContentPage, SearchResults};
use crate::error::UpstreamError;
use crate::tracking::TrackingEvent;

/// Result type for upstream calls.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Base URLs of the APIs a token grants access to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedApis {
    #[serde(default)]
    pub knowledge: String,
}

/// Response of the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
    pub access_token: String,
    pub expiration: i64,
    #[serde(default)]
    pub apis: GrantedApis,
}

/// Response of the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedToken {
    pub access_token: String,
    pub expiration: i64,
}

/// Auth service: issues and refreshes bearer tokens.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Authenticate with the API key and secret.
    async fn auth(&self, api_key: &str, secret: &str) -> UpstreamResult<AuthGrant>;

    /// Exchange a still-valid token for a fresh one.
    async fn refresh(&self, api_key: &str, access_token: &str) -> UpstreamResult<RefreshedToken>;
}

/// Everything a KM API call needs besides its own parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KmCredentials {
    pub api_key: String,
    pub access_token: String,
    /// Versioned KM API base URL, e.g. `https://km.example.com/prod/v1`.
    pub base_url: String,
    /// Value of `x-inbenta-env`.
    pub env: String,
    /// Value of `x-inbenta-source`, when events are tagged with a source.
    pub source: Option<String>,
    pub user_type: i64,
    /// Value of `x-inbenta-session`, once a tracking session exists.
    pub session_token: Option<String>,
}

impl KmCredentials {
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }
}

/// Knowledge-management API.
///
/// One value is bound to one set of credentials; see [`KnowledgeApiFactory`].
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    /// Instant search used by the autocomplete widget. Not tracked upstream.
    async fn autocomplete(&self, query: &str) -> UpstreamResult<Vec<Content>>;

    async fn search(&self, query: &str) -> UpstreamResult<SearchResults>;

    async fn popular(&self, length: usize) -> UpstreamResult<Vec<Content>>;

    /// One page of the full content listing.
    async fn contents(&self, length: usize, offset: usize) -> UpstreamResult<ContentPage>;

    /// Contents matching `slug`. `tracking = Some(false)` disables the
    /// implicit click event upstream.
    async fn content_by_slug(&self, slug: &str, tracking: Option<bool>)
        -> UpstreamResult<Vec<Content>>;

    /// The category followed by its descendants down to `max_depth`.
    async fn category_by_id(&self, id: i64, max_depth: Option<i32>)
        -> UpstreamResult<Vec<Category>>;

    async fn category_by_slug(&self, slug: &str, max_depth: Option<i32>)
        -> UpstreamResult<Vec<Category>>;

    /// Every category down to `max_depth` (`-1` for no limit).
    async fn categories(&self, max_depth: Option<i32>) -> UpstreamResult<Vec<Category>>;

    async fn category_contents(&self, id: i64) -> UpstreamResult<Vec<Content>>;

    async fn related_contents(&self, id: i64) -> UpstreamResult<Vec<Content>>;

    async fn track(&self, event: &TrackingEvent) -> UpstreamResult<()>;

    /// Raw app data document `data_id`, optionally filtered by `name`.
    async fn app_data(&self, data_id: &str, name: Option<&str>) -> UpstreamResult<Value>;

    /// Open a tracking session and return its token.
    async fn create_session(&self) -> UpstreamResult<String>;

    async fn track_user_info(&self, data: Value) -> UpstreamResult<()>;
}

/// Builds KM clients bound to a set of credentials.
pub trait KnowledgeApiFactory: Send + Sync {
    fn connect(&self, credentials: KmCredentials) -> Arc<dyn KnowledgeApi>;
}
