//! Home page: search box, popular contents and the root category.

use axum::{extract::State, response::Html};
use helpsite_core::TrackingMap;

use super::{popular, popular_section, render, root_category_section, search_box};
use crate::error::ApiResult;
use crate::middleware::{Km, Lang, PageContext, RequestSession};
use crate::state::AppState;

pub async fn home_page(
    State(state): State<AppState>,
    page: PageContext,
    Km(km): Km,
    Lang(lang): Lang,
    session: RequestSession,
) -> ApiResult<Html<String>> {
    let config = &state.config;
    let urls = &page.urls;
    let mut tracking = TrackingMap::new();

    let popular = popular(km.as_ref(), urls, config.popular_length, &mut tracking).await?;
    let categories = root_category_section(
        state.cache.as_ref(),
        km.as_ref(),
        urls,
        &lang,
        config.cache_ttl,
        config.categories_per_line,
    )
    .await?;

    session.merge_tracking(tracking).await;

    let body = format!(
        "{}{}{}",
        search_box(&lang, urls, ""),
        popular_section(&lang, &popular),
        categories
    );
    Ok(render(
        &lang,
        &page,
        &lang.translate("METADATA_HOME_TITLE"),
        &lang.translate("METADATA_HOME_DESCRIPTION"),
        &body,
    ))
}
