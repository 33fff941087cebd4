//! Helpsite Test Utilities
//!
//! In-memory doubles for the upstream APIs and fixtures describing a small
//! knowledge base:
//! - [`MockAuthApi`]: issues tokens and counts auth/refresh calls
//! - [`MockKnowledgeApi`]: serves canned contents and categories, records
//!   every call, tracking event and credential set it sees
//! - [`fixtures`]: builders for contents, categories and a ready-made
//!   knowledge base

pub mod fixtures;

pub use helpsite_storage::InMemoryCacheBackend;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use helpsite_core::{
    AuthApi, AuthGrant, Category, Content, ContentPage, GrantedApis, KmCredentials, KnowledgeApi,
    KnowledgeApiFactory, RefreshedToken, SearchResults, SearchTracking, TrackingEvent,
    UpstreamError, UpstreamResult,
};
use serde_json::Value;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// AUTH API
// ============================================================================

#[derive(Debug)]
struct AuthState {
    issued: usize,
    refreshed: usize,
    lifetime_secs: i64,
    knowledge_url: String,
    refreshed_tokens: Vec<String>,
    failure: Option<UpstreamError>,
}

/// Auth service double.
///
/// Tokens are named `token-{n}` in issue order; refreshed ones
/// `refreshed-{n}`. Each expires `lifetime_secs` after the call.
#[derive(Debug, Clone)]
pub struct MockAuthApi {
    state: Arc<Mutex<AuthState>>,
}

impl Default for MockAuthApi {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(AuthState {
                issued: 0,
                refreshed: 0,
                lifetime_secs: 3_600,
                knowledge_url: "https://km.test".to_string(),
                refreshed_tokens: Vec::new(),
                failure: None,
            })),
        }
    }
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lifetime_secs(self, lifetime_secs: i64) -> Self {
        lock(&self.state).lifetime_secs = lifetime_secs;
        self
    }

    pub fn failing(self, error: UpstreamError) -> Self {
        lock(&self.state).failure = Some(error);
        self
    }

    pub fn auth_calls(&self) -> usize {
        lock(&self.state).issued
    }

    pub fn refresh_calls(&self) -> usize {
        lock(&self.state).refreshed
    }

    /// Tokens handed to `refresh`, in call order.
    pub fn refreshed_tokens(&self) -> Vec<String> {
        lock(&self.state).refreshed_tokens.clone()
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn auth(&self, _api_key: &str, _secret: &str) -> UpstreamResult<AuthGrant> {
        let mut state = lock(&self.state);
        if let Some(error) = state.failure.clone() {
            return Err(error);
        }
        state.issued += 1;
        Ok(AuthGrant {
            access_token: format!("token-{}", state.issued),
            expiration: Utc::now().timestamp() + state.lifetime_secs,
            apis: GrantedApis {
                knowledge: state.knowledge_url.clone(),
            },
        })
    }

    async fn refresh(&self, _api_key: &str, access_token: &str) -> UpstreamResult<RefreshedToken> {
        let mut state = lock(&self.state);
        if let Some(error) = state.failure.clone() {
            return Err(error);
        }
        state.refreshed += 1;
        state.refreshed_tokens.push(access_token.to_string());
        Ok(RefreshedToken {
            access_token: format!("refreshed-{}", state.refreshed),
            expiration: Utc::now().timestamp() + state.lifetime_secs,
        })
    }
}

// ============================================================================
// KNOWLEDGE API
// ============================================================================

#[derive(Debug, Default)]
struct KnowledgeState {
    categories: Vec<Category>,
    contents: Vec<Content>,
    popular: Vec<Content>,
    search_results: Vec<Content>,
    search_code: Option<String>,
    autocomplete: Vec<Content>,
    related: HashMap<i64, Vec<Content>>,
    category_contents: HashMap<i64, Vec<Content>>,
    app_data: HashMap<String, Value>,
    sessions_created: usize,
    events: Vec<TrackingEvent>,
    user_info: Vec<Value>,
    calls: Vec<String>,
    credentials: Vec<KmCredentials>,
    failure: Option<UpstreamError>,
    operation_failures: HashMap<String, UpstreamError>,
}

/// KM API double serving a canned knowledge base.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the router holds another.
#[derive(Debug, Clone, Default)]
pub struct MockKnowledgeApi {
    state: Arc<Mutex<KnowledgeState>>,
}

fn not_found(endpoint: String) -> UpstreamError {
    UpstreamError::NotFound {
        api: "km".to_string(),
        endpoint,
    }
}

impl MockKnowledgeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(self, category: Category) -> Self {
        lock(&self.state).categories.push(category);
        self
    }

    /// Content reachable by slug and listed in the sitemap.
    pub fn with_content(self, content: Content) -> Self {
        lock(&self.state).contents.push(content);
        self
    }

    pub fn with_popular(self, popular: Vec<Content>) -> Self {
        lock(&self.state).popular = popular;
        self
    }

    pub fn with_search_results(self, results: Vec<Content>, search_code: Option<&str>) -> Self {
        {
            let mut state = lock(&self.state);
            state.search_results = results;
            state.search_code = search_code.map(str::to_string);
        }
        self
    }

    pub fn with_autocomplete(self, suggestions: Vec<Content>) -> Self {
        lock(&self.state).autocomplete = suggestions;
        self
    }

    pub fn with_related(self, content_id: i64, related: Vec<Content>) -> Self {
        lock(&self.state).related.insert(content_id, related);
        self
    }

    pub fn with_category_contents(self, category_id: i64, contents: Vec<Content>) -> Self {
        lock(&self.state).category_contents.insert(category_id, contents);
        self
    }

    /// App data document returned for `name`.
    pub fn with_app_data(self, name: &str, value: Value) -> Self {
        lock(&self.state).app_data.insert(name.to_string(), value);
        self
    }

    /// Make every call fail with `error`.
    pub fn failing(self, error: UpstreamError) -> Self {
        lock(&self.state).failure = Some(error);
        self
    }

    /// Make only `operation` fail with `error`.
    pub fn failing_on(self, operation: &str, error: UpstreamError) -> Self {
        lock(&self.state)
            .operation_failures
            .insert(operation.to_string(), error);
        self
    }

    /// Tracking events received so far, in order.
    pub fn events(&self) -> Vec<TrackingEvent> {
        lock(&self.state).events.clone()
    }

    /// Names of the operations called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    /// Credentials every client was bound to, in connection order.
    pub fn credentials(&self) -> Vec<KmCredentials> {
        lock(&self.state).credentials.clone()
    }

    pub fn sessions_created(&self) -> usize {
        lock(&self.state).sessions_created
    }

    pub fn user_info(&self) -> Vec<Value> {
        lock(&self.state).user_info.clone()
    }

    fn begin(&self, operation: &str) -> UpstreamResult<MutexGuard<'_, KnowledgeState>> {
        let mut state = lock(&self.state);
        state.calls.push(operation.to_string());
        let failure = state
            .failure
            .clone()
            .or_else(|| state.operation_failures.get(operation).cloned());
        match failure {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    fn subtree(categories: &[Category], root: &Category, max_depth: Option<i32>) -> Vec<Category> {
        let mut listing = vec![root.clone()];
        if max_depth.unwrap_or(0) != 0 {
            listing.extend(
                categories
                    .iter()
                    .filter(|c| c.id != root.id && c.parent.as_id() == root.id)
                    .cloned(),
            );
        }
        listing
    }
}

#[async_trait]
impl KnowledgeApi for MockKnowledgeApi {
    async fn autocomplete(&self, _query: &str) -> UpstreamResult<Vec<Content>> {
        Ok(self.begin("autocomplete")?.autocomplete.clone())
    }

    async fn search(&self, _query: &str) -> UpstreamResult<SearchResults> {
        let state = self.begin("search")?;
        Ok(SearchResults {
            results: state.search_results.clone(),
            tracking: SearchTracking {
                search_code: state.search_code.clone(),
            },
        })
    }

    async fn popular(&self, length: usize) -> UpstreamResult<Vec<Content>> {
        let state = self.begin("popular")?;
        Ok(state.popular.iter().take(length).cloned().collect())
    }

    async fn contents(&self, length: usize, offset: usize) -> UpstreamResult<ContentPage> {
        let state = self.begin("contents")?;
        let results: Vec<Content> = state.contents.iter().skip(offset).take(length).cloned().collect();
        Ok(ContentPage {
            has_more: offset + results.len() < state.contents.len(),
            results,
        })
    }

    async fn content_by_slug(
        &self,
        slug: &str,
        _tracking: Option<bool>,
    ) -> UpstreamResult<Vec<Content>> {
        let state = self.begin("content_by_slug")?;
        let found: Vec<Content> = state.contents.iter().filter(|c| c.slug == slug).cloned().collect();
        if found.is_empty() {
            return Err(not_found(format!("/contents/slug/{}", slug)));
        }
        Ok(found)
    }

    async fn category_by_id(
        &self,
        id: i64,
        max_depth: Option<i32>,
    ) -> UpstreamResult<Vec<Category>> {
        let state = self.begin("category_by_id")?;
        let root = state
            .categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(format!("/categories/{}", id)))?;
        Ok(Self::subtree(&state.categories, root, max_depth))
    }

    async fn category_by_slug(
        &self,
        slug: &str,
        max_depth: Option<i32>,
    ) -> UpstreamResult<Vec<Category>> {
        let state = self.begin("category_by_slug")?;
        let root = state
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .ok_or_else(|| not_found(format!("/categories/slug/{}", slug)))?;
        Ok(Self::subtree(&state.categories, root, max_depth))
    }

    async fn categories(&self, _max_depth: Option<i32>) -> UpstreamResult<Vec<Category>> {
        let state = self.begin("categories")?;
        Ok(state.categories.iter().filter(|c| !c.is_root()).cloned().collect())
    }

    async fn category_contents(&self, id: i64) -> UpstreamResult<Vec<Content>> {
        let state = self.begin("category_contents")?;
        Ok(state.category_contents.get(&id).cloned().unwrap_or_default())
    }

    async fn related_contents(&self, id: i64) -> UpstreamResult<Vec<Content>> {
        let state = self.begin("related_contents")?;
        Ok(state.related.get(&id).cloned().unwrap_or_default())
    }

    async fn track(&self, event: &TrackingEvent) -> UpstreamResult<()> {
        self.begin("track")?.events.push(event.clone());
        Ok(())
    }

    async fn app_data(&self, _data_id: &str, name: Option<&str>) -> UpstreamResult<Value> {
        let state = self.begin("app_data")?;
        Ok(name
            .and_then(|name| state.app_data.get(name).cloned())
            .unwrap_or_else(|| serde_json::json!({"results": []})))
    }

    async fn create_session(&self) -> UpstreamResult<String> {
        let mut state = self.begin("create_session")?;
        state.sessions_created += 1;
        Ok(format!("session-{}", state.sessions_created))
    }

    async fn track_user_info(&self, data: Value) -> UpstreamResult<()> {
        self.begin("track_user_info")?.user_info.push(data);
        Ok(())
    }
}

impl KnowledgeApiFactory for MockKnowledgeApi {
    fn connect(&self, credentials: KmCredentials) -> Arc<dyn KnowledgeApi> {
        lock(&self.state).credentials.push(credentials);
        Arc::new(self.clone())
    }
}
