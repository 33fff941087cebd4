//! Labels and category metadata for the request.
//!
//! The locale files are layered with the `labels` and `categories_metadata`
//! app data entries, each cached for the configured cache TTL. The resulting
//! [`LanguageManager`] is injected into the request extensions.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use helpsite_core::KnowledgeApi;
use helpsite_storage::CacheStoreExt;

use crate::error::{ApiError, ApiResult};
use crate::locale::{
    categories_metadata_from_app_data, labels_from_app_data, CategoryMetadata, LanguageManager,
};
use crate::state::AppState;

/// App data entry holding labels and category metadata.
pub const APP_DATA_ID: &str = "app_data";
/// Cache key (and app data name) of the labels.
pub const LABELS_KEY: &str = "labels";
/// Cache key (and app data name) of the category metadata.
pub const CATEGORIES_METADATA_KEY: &str = "categories_metadata";

async fn load_language(state: &AppState, km: &dyn KnowledgeApi) -> ApiResult<LanguageManager> {
    let ttl = Some(state.config.cache_ttl);

    let labels: BTreeMap<String, String> = state
        .cache
        .read_through(LABELS_KEY, ttl, || async move {
            km.app_data(APP_DATA_ID, Some(LABELS_KEY))
                .await
                .map(|document| labels_from_app_data(&document))
        })
        .await?;

    let categories: Vec<CategoryMetadata> = state
        .cache
        .read_through(CATEGORIES_METADATA_KEY, ttl, || async move {
            km.app_data(APP_DATA_ID, Some(CATEGORIES_METADATA_KEY))
                .await
                .map(|document| categories_metadata_from_app_data(&document))
        })
        .await?;

    Ok(LanguageManager::new(&state.locale).with_overrides(labels, categories))
}

/// Axum middleware building the [`LanguageManager`] of the request.
///
/// Requires the KM client injected by the session middleware.
pub async fn language_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let km = request
        .extensions()
        .get::<Arc<dyn KnowledgeApi>>()
        .cloned()
        .ok_or_else(|| {
            ApiError::internal_error(
                "KM client not found in request extensions. \
                 Ensure session_middleware is applied to this route.",
            )
        })?;

    let language = load_language(&state, km.as_ref()).await?;
    request.extensions_mut().insert(language);
    Ok(next.run(request).await)
}
