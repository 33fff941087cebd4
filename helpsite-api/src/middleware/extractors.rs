//! Typed extractors for what the page middleware injects.
//!
//! Each one fails with a 500 when the layer that should have run did not.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use helpsite_core::KnowledgeApi;

use super::session::RequestSession;
use crate::config::HelpsiteConfig;
use crate::error::ApiError;
use crate::locale::LanguageManager;
use crate::urls::UrlBuilder;

fn missing(what: &str, layer: &str) -> ApiError {
    ApiError::internal_error(format!(
        "{} not found in request extensions. Ensure {} is applied to this route.",
        what, layer
    ))
}

/// KM client bound to the visitor's tracking session.
#[derive(Clone)]
pub struct Km(pub Arc<dyn KnowledgeApi>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Km
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<dyn KnowledgeApi>>()
            .cloned()
            .map(Km)
            .ok_or_else(|| missing("KM client", "session_middleware"))
    }
}

impl std::ops::Deref for Km {
    type Target = dyn KnowledgeApi;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Labels and category metadata of the request.
#[derive(Debug, Clone)]
pub struct Lang(pub LanguageManager);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Lang
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<LanguageManager>()
            .cloned()
            .map(Lang)
            .ok_or_else(|| missing("LanguageManager", "language_middleware"))
    }
}

impl std::ops::Deref for Lang {
    type Target = LanguageManager;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestSession>()
            .cloned()
            .ok_or_else(|| missing("Session", "session_middleware"))
    }
}

/// URL builder and canonical URL of the page being rendered.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub urls: UrlBuilder,
    pub canonical: String,
    pub allow_indexing: bool,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for PageContext
where
    Arc<HelpsiteConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<HelpsiteConfig>::from_ref(state);
        let urls = UrlBuilder::from_headers(config.base_url.as_deref(), &parts.headers);
        let canonical = urls.canonical(parts.uri.path());
        Ok(PageContext {
            urls,
            canonical,
            allow_indexing: config.allow_indexing,
        })
    }
}
