//! Autocomplete suggestions for the search box.
//!
//! Suggestions link to their content tagged `?t=a`; the session remembers
//! the query that produced each one so the click is reported as an
//! autocompleter click.

use axum::{extract::Query, Json};
use helpsite_core::tracking::KEY_AUTOCOMPLETE;
use helpsite_core::{AutocompleteTracking, Content, TrackingMap, TrackingPayload};
use serde::Serialize;

use super::results::SearchParams;
use crate::error::ApiResult;
use crate::middleware::{Km, PageContext, RequestSession};
use crate::urls::{tracked, UrlBuilder};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: i64,
    pub title_highlight: Option<String>,
    pub seo_friendly_url: String,
}

/// Suggestions for `query`, with the tracking state they produce.
pub fn suggestions(
    urls: &UrlBuilder,
    query: &str,
    results: Vec<Content>,
) -> (Vec<Suggestion>, TrackingMap) {
    let mut tracking = TrackingMap::new();
    tracking.declare(KEY_AUTOCOMPLETE);

    let suggestions = results
        .into_iter()
        .map(|content| {
            tracking.record(
                KEY_AUTOCOMPLETE,
                &content.slug,
                TrackingPayload::Autocomplete(AutocompleteTracking {
                    query: query.to_string(),
                    content_id: content.id,
                }),
            );
            Suggestion {
                id: content.id,
                seo_friendly_url: tracked(&urls.contents(&content.slug), KEY_AUTOCOMPLETE),
                title_highlight: content.title_highlight,
            }
        })
        .collect();
    (suggestions, tracking)
}

/// `GET /autocomplete?query=...`
pub async fn autocomplete(
    page: PageContext,
    Km(km): Km,
    session: RequestSession,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Suggestion>>> {
    let query = params.required_query()?;
    let results = km.autocomplete(&query).await?;

    let (suggestions, tracking) = suggestions(&page.urls, &query, results);
    session.merge_tracking(tracking).await;
    Ok(Json(suggestions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpsite_test_utils::fixtures;
    use serde_json::json;

    #[test]
    fn test_suggestions_are_tracked_with_their_query() {
        let mut content = fixtures::content(10, "reset-password", "Reset your password");
        content.title_highlight = Some("<em>Reset</em> your password".to_string());

        let (suggestions, tracking) =
            suggestions(&UrlBuilder::new("https://help.test"), "reset", vec![content]);

        assert_eq!(
            serde_json::to_value(&suggestions).expect("suggestions should serialize"),
            json!([{
                "id": 10,
                "titleHighlight": "<em>Reset</em> your password",
                "seoFriendlyUrl": "https://help.test/contents/reset-password?t=a"
            }])
        );
        assert_eq!(
            tracking.lookup("a", "reset-password"),
            Some(&TrackingPayload::Autocomplete(AutocompleteTracking {
                query: "reset".to_string(),
                content_id: 10,
            }))
        );
    }

    #[test]
    fn test_no_suggestions_still_replace_previous_ones() {
        let (suggestions, tracking) = suggestions(&UrlBuilder::new("https://h"), "zzz", Vec::new());
        assert!(suggestions.is_empty());
        assert_eq!(tracking.keys().collect::<Vec<_>>(), vec!["a"]);
    }
}
