//! `sitemap.xml`
//!
//! Lists the home page, every content and every category. The list is built
//! once, stamped with the day it was built, and cached without expiry.

use std::collections::HashSet;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use helpsite_core::{build_tree, group_by_parent, Category, CategoryNode, KnowledgeApi, ParentId};
use helpsite_storage::CacheStoreExt;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::middleware::{Km, PageContext};
use crate::state::AppState;
use crate::urls::UrlBuilder;
use crate::views;

/// Cache key of the sitemap entries.
pub const SITEMAP_KEY: &str = "sitemap_urls";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapUrls {
    pub last_modification: String,
    pub urls: Vec<String>,
}

/// Slugs of every content, fetched `page_length` at a time.
async fn all_content_slugs(km: &dyn KnowledgeApi, page_length: usize) -> ApiResult<Vec<String>> {
    let page_length = page_length.max(1);
    let mut slugs = Vec::new();
    let mut offset = 0;
    loop {
        let page = km.contents(page_length, offset).await?;
        let fetched = page.results.len();
        slugs.extend(page.results.into_iter().map(|content| content.slug));
        if !page.has_more || fetched == 0 {
            break;
        }
        offset += page_length;
    }
    Ok(slugs)
}

fn push_tree(node: &CategoryNode, ordered: &mut Vec<Category>) {
    ordered.push(node.category.clone());
    for child in &node.children {
        push_tree(child, ordered);
    }
}

/// Categories with every parent listed before its children. Categories not
/// reachable from a top-level one keep their listing order, at the end.
pub fn categories_in_tree_order(categories: &[Category]) -> Vec<Category> {
    let mut ordered = Vec::with_capacity(categories.len());
    let top_level: Vec<i64> = group_by_parent(categories)
        .get(&ParentId::Root)
        .map(|roots| roots.iter().map(|category| category.id).collect())
        .unwrap_or_default();
    for id in top_level {
        if let Some(tree) = build_tree(categories, id) {
            push_tree(&tree, &mut ordered);
        }
    }

    let placed: HashSet<i64> = ordered.iter().map(|category| category.id).collect();
    ordered.extend(
        categories
            .iter()
            .filter(|category| !placed.contains(&category.id))
            .cloned(),
    );
    ordered
}

pub async fn build_sitemap(
    km: &dyn KnowledgeApi,
    urls: &UrlBuilder,
    page_length: usize,
    today: String,
) -> ApiResult<SitemapUrls> {
    let mut entries = vec![urls.home()];
    entries.extend(
        all_content_slugs(km, page_length)
            .await?
            .iter()
            .map(|slug| urls.contents(slug)),
    );
    let categories = km.categories(Some(-1)).await?;
    entries.extend(
        categories_in_tree_order(&categories)
            .iter()
            .map(|category| urls.categories(&category.slug)),
    );

    Ok(SitemapUrls {
        last_modification: today,
        urls: entries,
    })
}

/// `GET /sitemap.xml`
pub async fn sitemap(
    State(state): State<AppState>,
    page: PageContext,
    Km(km): Km,
) -> ApiResult<Response> {
    let page_length = state.config.sitemap_page_length;
    let km = km.as_ref();
    let urls = &page.urls;
    let sitemap: SitemapUrls = state
        .cache
        .read_through(SITEMAP_KEY, None, || async move {
            let today = Utc::now().format("%Y-%m-%d").to_string();
            build_sitemap(km, urls, page_length, today).await
        })
        .await?;

    let xml = views::sitemap_xml(&sitemap.urls, &sitemap.last_modification);
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpsite_test_utils::fixtures;

    #[tokio::test]
    async fn test_sitemap_pages_through_contents_and_lists_categories() {
        let km = fixtures::knowledge_base();
        let sitemap = build_sitemap(
            &km,
            &UrlBuilder::new("https://help.test"),
            2,
            "2026-10-19".to_string(),
        )
        .await
        .expect("sitemap should build");

        assert_eq!(
            sitemap.urls,
            vec![
                "https://help.test",
                "https://help.test/contents/reset-password",
                "https://help.test/contents/two-factor",
                "https://help.test/contents/invoices",
                "https://help.test/categories/account",
                "https://help.test/categories/security",
                "https://help.test/categories/passwords",
                "https://help.test/categories/billing",
            ]
        );
        assert_eq!(km.call_count("contents"), 2);
        assert_eq!(sitemap.last_modification, "2026-10-19");
    }

    #[test]
    fn test_orphan_categories_are_kept() {
        let categories = vec![
            fixtures::category(7, "orphan", "Orphan", ParentId::Category(99)),
            fixtures::category(4, "billing", "Billing", ParentId::Root),
        ];
        let ordered: Vec<i64> = categories_in_tree_order(&categories)
            .iter()
            .map(|category| category.id)
            .collect();
        assert_eq!(ordered, vec![4, 7]);
    }
}
