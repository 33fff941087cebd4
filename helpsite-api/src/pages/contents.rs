//! Content page and click attribution.
//!
//! A content reached from a listing carries `?t={key}`: the click is
//! reported with whatever that listing recorded for the slug. Without `t`
//! the visitor came from outside and the content's own click code is used.

use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use helpsite_core::tracking::KEY_CONTENT;
use helpsite_core::{Content, Crumb, ParentId, TrackingEvent, TrackingMap};
use serde::Deserialize;

use super::{
    ancestor_trail, decorate_contents, home_breadcrumb, popular, popular_section, render,
    search_box,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Km, Lang, PageContext, RequestSession};
use crate::state::AppState;
use crate::urls::sanitize_special_chars;
use crate::views;

#[derive(Debug, Default, Deserialize)]
pub struct ContentParams {
    /// Tracking key of the listing the visitor came from.
    pub t: Option<String>,
}

/// Event to report for a visit to `content`.
///
/// `tracking` must be the session state from before the current page
/// recorded its own links.
pub fn attribution(
    tracking: &TrackingMap,
    key: Option<&str>,
    content: &Content,
) -> Option<TrackingEvent> {
    match key {
        None => content
            .tracking
            .click_code
            .as_deref()
            .map(TrackingEvent::click),
        Some(key) => tracking
            .lookup(key, &content.slug)
            .map(TrackingEvent::for_payload),
    }
}

/// `GET /contents/{slug}`
pub async fn content_page(
    State(state): State<AppState>,
    page: PageContext,
    Km(km): Km,
    Lang(lang): Lang,
    session: RequestSession,
    Path(slug): Path<String>,
    Query(params): Query<ContentParams>,
) -> ApiResult<Html<String>> {
    let config = &state.config;
    let urls = &page.urls;
    let slug = sanitize_special_chars(&slug);
    let key = params.t.as_deref().map(sanitize_special_chars);

    let found = km
        .content_by_slug(&slug, Some(false))
        .await
        .map_err(ApiError::from_lookup)?;
    let previous = session.tracking().await;

    let mut tracking = TrackingMap::new();
    let content = decorate_contents(km.as_ref(), urls, found, KEY_CONTENT, &mut tracking)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("Content '{}' not found", slug)))?;

    match attribution(&previous, key.as_deref(), &content) {
        Some(event) => {
            tracing::debug!(slug = %content.slug, event_type = %event.event_type, "Tracking content visit");
            km.track(&event).await?;
        }
        None => tracing::debug!(slug = %content.slug, key = ?key, "Content visit not attributable"),
    }

    let mut breadcrumb = home_breadcrumb(&lang, urls);
    if let Some(category_id) = content.primary_category() {
        breadcrumb.extend(ancestor_trail(km.as_ref(), urls, ParentId::from_id(category_id)).await?);
    }
    breadcrumb.push(Crumb::new(content.title.clone(), urls.contents(&content.slug)));

    let popular = popular(km.as_ref(), urls, config.popular_length, &mut tracking).await?;
    session.merge_tracking(tracking).await;

    let back_label = lang.translate("BACK_BUTTON");
    let body = format!(
        "{}{}{}{}{}",
        search_box(&lang, urls, ""),
        views::breadcrumb(&breadcrumb),
        views::content_article(&content, breadcrumb.back_url().map(|url| (url, back_label.as_str()))),
        views::content_list("related", &lang.translate("RELATED_TITLE"), &content.related),
        popular_section(&lang, &popular),
    );
    Ok(render(&lang, &page, &content.title, &content.meta_description(), &body))
}
