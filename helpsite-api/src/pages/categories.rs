//! Category pages.
//!
//! `/categories` shows the root category, `/categories/{slug}` any other.
//! Both list the subcategories in rows, the contents filed under the
//! category (tracked under `cc`) and the popular contents.

use axum::{
    extract::{Path, State},
    response::Html,
};
use helpsite_core::tracking::KEY_CATEGORY_CONTENTS;
use helpsite_core::{subcategory_rows, Crumb, TrackingMap};

use super::{
    ancestor_trail, category_by_slug, decorate_categories, decorate_contents, home_breadcrumb,
    popular, popular_section, render, root_category, search_box,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Km, Lang, PageContext, RequestSession};
use crate::state::AppState;
use crate::urls::sanitize_special_chars;
use crate::views;

/// `GET /categories`
pub async fn categories_index(
    state: State<AppState>,
    page: PageContext,
    km: Km,
    lang: Lang,
    session: RequestSession,
) -> ApiResult<Html<String>> {
    category_page(state, page, km, lang, session, String::new()).await
}

/// `GET /categories/{slug}`
pub async fn category(
    state: State<AppState>,
    page: PageContext,
    km: Km,
    lang: Lang,
    session: RequestSession,
    Path(slug): Path<String>,
) -> ApiResult<Html<String>> {
    category_page(state, page, km, lang, session, slug).await
}

async fn category_page(
    State(state): State<AppState>,
    page: PageContext,
    Km(km): Km,
    Lang(lang): Lang,
    session: RequestSession,
    slug: String,
) -> ApiResult<Html<String>> {
    let config = &state.config;
    let urls = &page.urls;
    let slug = sanitize_special_chars(&slug);

    let categories = if slug.is_empty() {
        root_category(state.cache.as_ref(), km.as_ref(), config.cache_ttl).await
    } else {
        category_by_slug(state.cache.as_ref(), km.as_ref(), &slug, config.cache_ttl).await
    }
    .map_err(ApiError::from_lookup)?;
    let categories = decorate_categories(urls, categories);
    let current = categories
        .first()
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("Category '{}' not found", slug)))?;

    let rows = subcategory_rows(&categories, current.id, config.categories_per_line);

    let mut tracking = TrackingMap::new();
    let contents = km.category_contents(current.id).await?;
    let contents =
        decorate_contents(km.as_ref(), urls, contents, KEY_CATEGORY_CONTENTS, &mut tracking)
            .await?;

    let mut breadcrumb = home_breadcrumb(&lang, urls);
    if !current.is_root() {
        breadcrumb.extend(ancestor_trail(km.as_ref(), urls, current.parent).await?);
        breadcrumb.push(Crumb::new(current.name.clone(), urls.categories(&current.slug)));
    }

    let popular = popular(km.as_ref(), urls, config.popular_length, &mut tracking).await?;
    session.merge_tracking(tracking).await;

    let metadata = lang.category_metadata(&current.name);
    let back = breadcrumb
        .back_url()
        .map(|url| views::back_link(url, &lang.translate("BACK_BUTTON")))
        .unwrap_or_default();
    let body = format!(
        "{}{}{}{}{}{}{}",
        search_box(&lang, urls, ""),
        views::breadcrumb(&breadcrumb),
        back,
        views::section_header(&metadata.title, &metadata.introduction),
        views::category_grid(&lang.translate("CATEGORIES_TITLE"), &rows),
        views::content_list(
            "category-contents",
            &lang.translate("CATEGORY_CONTENTS_TITLE"),
            &contents
        ),
        popular_section(&lang, &popular),
    );
    Ok(render(&lang, &page, &metadata.title, &metadata.description, &body))
}
