//! Search results page.

use axum::{
    extract::{Query, State},
    response::Html,
};
use helpsite_core::tracking::KEY_RESULTS;
use helpsite_core::TrackingMap;
use serde::Deserialize;

use super::{decorate_contents, render, root_category_section, search_box};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Km, Lang, PageContext, RequestSession};
use crate::state::AppState;
use crate::urls::sanitize_special_chars;
use crate::views;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

impl SearchParams {
    /// The sanitised query; a request without one is rejected.
    pub fn required_query(&self) -> ApiResult<String> {
        self.query
            .as_deref()
            .map(sanitize_special_chars)
            .ok_or_else(|| ApiError::missing_parameter("query"))
    }
}

/// `GET /results?query=...`
pub async fn results_page(
    State(state): State<AppState>,
    page: PageContext,
    Km(km): Km,
    Lang(lang): Lang,
    session: RequestSession,
    Query(params): Query<SearchParams>,
) -> ApiResult<Html<String>> {
    let config = &state.config;
    let urls = &page.urls;
    let query = params.required_query()?;

    let search = km.search(&query).await?;
    let search_code = search.search_code().map(str::to_string);

    let mut tracking = TrackingMap::new();
    let results =
        decorate_contents(km.as_ref(), urls, search.results, KEY_RESULTS, &mut tracking).await?;
    session.merge_tracking(tracking).await;

    let categories = root_category_section(
        state.cache.as_ref(),
        km.as_ref(),
        urls,
        &lang,
        config.cache_ttl,
        config.categories_per_line,
    )
    .await?;

    let heading = format!("{} \"{}\"", lang.translate("RESULTS_TITLE"), query);
    let listing = if results.is_empty() {
        views::empty_notice(&lang.translate("RESULTS_EMPTY"))
    } else {
        views::content_list("results", &lang.translate("METADATA_CONTENTS_TITLE"), &results)
    };
    let body = format!(
        "{}{}{}{}{}",
        search_box(&lang, urls, &query),
        views::back_link(&urls.home(), &lang.translate("BACK_BUTTON")),
        views::results_header(&heading, search_code.as_deref()),
        listing,
        categories,
    );
    Ok(render(
        &lang,
        &page,
        &lang.translate("METADATA_CONTENTS_TITLE"),
        &lang.translate("METADATA_CONTENTS_DESCRIPTION"),
        &body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_required_query() {
        let params = SearchParams {
            query: Some("<reset>".to_string()),
        };
        assert_eq!(params.required_query().expect("query is present"), "&#60;reset&#62;");

        let error = SearchParams::default()
            .required_query()
            .expect_err("query is missing");
        assert_eq!(error.code, ErrorCode::MissingParameter);
    }
}
