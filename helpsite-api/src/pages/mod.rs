//! Page aggregators.
//!
//! Each page reads what it needs from the KM API, decorates it (SEO URLs,
//! breadcrumbs, subcategory rows, related and popular contents), records the
//! tracking payloads of every link it renders and hands the result to
//! [`crate::views`].
//!
//! Tracking payloads are collected into a page-local [`TrackingMap`] and
//! merged into the session once the page is assembled.

pub mod autocomplete;
pub mod categories;
pub mod contents;
pub mod home;
pub mod results;
pub mod robots;
pub mod sitemap;
pub mod tracking;

use std::collections::HashSet;
use std::time::Duration;

use axum::response::Html;
use helpsite_core::tracking::KEY_POPULAR;
use helpsite_core::{
    related_key, subcategory_rows, Breadcrumb, Category, Content, Crumb, KnowledgeApi, ParentId,
    TrackingMap, UpstreamResult, ROOT_CATEGORY_ID,
};
use helpsite_storage::{CacheStore, CacheStoreExt};

use crate::error::ApiResult;
use crate::locale::LanguageManager;
use crate::middleware::PageContext;
use crate::urls::{tracked, UrlBuilder};
use crate::views::{self, PageMeta};

/// Cache key of the root category listing.
pub const ROOT_CATEGORY_KEY: &str = "root_category";

/// Cache key of the category listing for `slug`.
pub fn category_cache_key(slug: &str) -> String {
    format!("category_{}", slug)
}

/// Fetch related contents, point every link at its content page tagged with
/// `key` (`r{key}` for related ones) and record what each link attributes to.
///
/// Both keys are declared even when nothing ends up under them, so they
/// replace whatever the session held for them.
pub async fn decorate_contents(
    km: &dyn KnowledgeApi,
    urls: &UrlBuilder,
    contents: Vec<Content>,
    key: &str,
    tracking: &mut TrackingMap,
) -> ApiResult<Vec<Content>> {
    let related_tracking_key = related_key(key);
    tracking.declare(key);
    tracking.declare(&related_tracking_key);

    let mut decorated = Vec::with_capacity(contents.len());
    for mut content in contents {
        if content.has_related {
            let mut related = km.related_contents(content.id).await?;
            for item in &mut related {
                item.seo_friendly_url =
                    Some(tracked(&urls.contents(&item.slug), &related_tracking_key));
                if let Some(payload) = item.tracking.to_payload() {
                    tracking.record(&related_tracking_key, &item.slug, payload);
                }
            }
            content.related = related;
        }

        content.seo_friendly_url = Some(tracked(&urls.contents(&content.slug), key));
        if let Some(payload) = content.tracking.to_payload() {
            tracking.record(key, &content.slug, payload);
        }
        decorated.push(content);
    }
    Ok(decorated)
}

/// Point every content at its page, without tracking.
pub fn link_contents(urls: &UrlBuilder, contents: Vec<Content>) -> Vec<Content> {
    contents
        .into_iter()
        .map(|mut content| {
            content.seo_friendly_url = Some(urls.contents(&content.slug));
            content
        })
        .collect()
}

pub fn decorate_categories(urls: &UrlBuilder, categories: Vec<Category>) -> Vec<Category> {
    categories
        .into_iter()
        .map(|mut category| {
            category.seo_friendly_url = Some(urls.categories(&category.slug));
            category
        })
        .collect()
}

/// Root category and its direct children, cached for `ttl`.
pub async fn root_category(
    cache: &dyn CacheStore,
    km: &dyn KnowledgeApi,
    ttl: Duration,
) -> UpstreamResult<Vec<Category>> {
    cache
        .read_through(ROOT_CATEGORY_KEY, Some(ttl), || async move {
            km.category_by_id(ROOT_CATEGORY_ID, Some(1)).await
        })
        .await
}

/// Category `slug` and its direct children, cached for `ttl`.
pub async fn category_by_slug(
    cache: &dyn CacheStore,
    km: &dyn KnowledgeApi,
    slug: &str,
    ttl: Duration,
) -> UpstreamResult<Vec<Category>> {
    cache
        .read_through(&category_cache_key(slug), Some(ttl), || async move {
            km.category_by_slug(slug, Some(1)).await
        })
        .await
}

/// Crumbs from the top-level category down to `start`, included.
///
/// Walks up one category per call until the root. A parent already seen
/// ends the walk.
pub async fn ancestor_trail(
    km: &dyn KnowledgeApi,
    urls: &UrlBuilder,
    start: ParentId,
) -> ApiResult<Vec<Crumb>> {
    let mut trail = Vec::new();
    let mut visited = HashSet::new();
    let mut current = start;

    while let ParentId::Category(id) = current {
        if !visited.insert(id) {
            tracing::warn!(category_id = id, "Category parent cycle, breadcrumb truncated");
            break;
        }
        let Some(category) = km.category_by_id(id, None).await?.into_iter().next() else {
            break;
        };
        trail.push(Crumb::new(
            category.name.clone(),
            urls.categories(&category.slug),
        ));
        current = category.parent;
    }

    trail.reverse();
    Ok(trail)
}

pub fn home_breadcrumb(lang: &LanguageManager, urls: &UrlBuilder) -> Breadcrumb {
    Breadcrumb::home(lang.translate("CATEGORIES_BREADCRUMB_HOME"), urls.home())
}

/// Popular contents, tracked under `p`.
pub async fn popular(
    km: &dyn KnowledgeApi,
    urls: &UrlBuilder,
    length: usize,
    tracking: &mut TrackingMap,
) -> ApiResult<Vec<Content>> {
    let contents = km.popular(length).await?;
    decorate_contents(km, urls, contents, KEY_POPULAR, tracking).await
}

pub fn popular_section(lang: &LanguageManager, contents: &[Content]) -> String {
    views::content_list("popular", &lang.translate("POPULAR_TITLE"), contents)
}

pub fn search_box(lang: &LanguageManager, urls: &UrlBuilder, query: &str) -> String {
    views::search_box(
        &urls.results(),
        query,
        &lang.translate("SEARCH_BOX_PLACEHOLDER"),
        &lang.translate("SEARCH_BOX_BUTTON"),
    )
}

/// Subcategories of the root and the contents filed directly under it.
///
/// Root contents are linked without tracking.
pub async fn root_category_section(
    cache: &dyn CacheStore,
    km: &dyn KnowledgeApi,
    urls: &UrlBuilder,
    lang: &LanguageManager,
    ttl: Duration,
    per_line: usize,
) -> ApiResult<String> {
    let categories = decorate_categories(urls, root_category(cache, km, ttl).await?);
    let rows = subcategory_rows(&categories, ROOT_CATEGORY_ID, per_line);
    let contents = link_contents(urls, km.category_contents(ROOT_CATEGORY_ID).await?);

    Ok(format!(
        "{}{}",
        views::category_grid(&lang.translate("CATEGORIES_TITLE"), &rows),
        views::content_list(
            "category-contents",
            &lang.translate("CATEGORY_CONTENTS_TITLE"),
            &contents
        ),
    ))
}

/// Wrap `body` in the page layout.
pub fn render(
    lang: &LanguageManager,
    page: &PageContext,
    title: &str,
    description: &str,
    body: &str,
) -> Html<String> {
    let meta = PageMeta {
        lang: lang.lang(),
        title,
        description,
        allow_indexing: page.allow_indexing,
        canonical: Some(&page.canonical),
    };
    Html(views::layout(&meta, body))
}
