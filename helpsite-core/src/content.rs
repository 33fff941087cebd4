//! Knowledge-base contents as returned by the KM API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lenient;
use crate::tracking::{ClickTracking, TrackingPayload};

/// Attribute holding the main answer body of a content.
pub const ANSWER_TEXT: &str = "ANSWER_TEXT";

/// Maximum length of a page meta description, in characters.
pub const META_DESCRIPTION_MAX_CHARS: usize = 155;

/// Tracking codes attached to every content by the KM API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTracking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_code: Option<String>,
}

impl ContentTracking {
    /// Payload to stash in the session so that a later click can be attributed.
    ///
    /// Contents without a click code cannot be attributed and yield `None`.
    pub fn to_payload(&self) -> Option<TrackingPayload> {
        self.click_code.as_ref().map(|click_code| {
            TrackingPayload::Click(ClickTracking {
                click_code: click_code.clone(),
                rate_code: self.rate_code.clone(),
            })
        })
    }
}

/// A knowledge-base content.
///
/// Only the fields the helpsite reads are typed; everything else the API
/// sends is kept in `extra` and round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_highlight: Option<String>,
    #[serde(default)]
    pub tracking: ContentTracking,
    #[serde(default)]
    pub has_related: bool,
    #[serde(default, deserialize_with = "lenient::ids")]
    pub categories: Vec<i64>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_friendly_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Content>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Content {
    /// String value of an attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Meta description derived from the answer text: whitespace runs
    /// collapsed to a single space, cut to [`META_DESCRIPTION_MAX_CHARS`].
    pub fn meta_description(&self) -> String {
        let raw = self.attribute(ANSWER_TEXT).unwrap_or_default();
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(META_DESCRIPTION_MAX_CHARS).collect()
    }

    /// First category this content belongs to.
    pub fn primary_category(&self) -> Option<i64> {
        self.categories.first().copied()
    }
}

/// One page of the content listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPage {
    #[serde(default)]
    pub results: Vec<Content>,
    #[serde(default)]
    pub has_more: bool,
}

/// Tracking block of a search response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTracking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_code: Option<String>,
}

/// Search results with the tracking code used to rate the search itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub results: Vec<Content>,
    #[serde(default)]
    pub tracking: SearchTracking,
}

impl SearchResults {
    pub fn search_code(&self) -> Option<&str> {
        self.tracking.search_code.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content_from(value: Value) -> Content {
        serde_json::from_value(value).expect("content should parse")
    }

    #[test]
    fn test_content_parses_upstream_shape() {
        let content = content_from(json!({
            "id": "7",
            "slug": "reset-password",
            "title": "Reset your password",
            "hasRelated": true,
            "categories": [3, "4"],
            "tracking": {"clickCode": "ck-7", "rateCode": "rt-7"},
            "attributes": {"ANSWER_TEXT": "Go to settings"},
            "creationDate": "2019-01-01"
        }));

        assert_eq!(content.id, 7);
        assert_eq!(content.primary_category(), Some(3));
        assert!(content.has_related);
        assert_eq!(content.tracking.click_code.as_deref(), Some("ck-7"));
        assert_eq!(content.extra.get("creationDate"), Some(&json!("2019-01-01")));
    }

    #[test]
    fn test_meta_description_collapses_whitespace_and_truncates() {
        let long = format!("first\n\n  second\t{}", "x".repeat(300));
        let content = content_from(json!({"id": 1, "attributes": {"ANSWER_TEXT": long}}));

        let description = content.meta_description();
        assert!(description.starts_with("first second x"));
        assert_eq!(description.chars().count(), META_DESCRIPTION_MAX_CHARS);
    }

    #[test]
    fn test_meta_description_without_answer_text_is_empty() {
        let content = content_from(json!({"id": 1}));
        assert_eq!(content.meta_description(), "");
    }

    #[test]
    fn test_search_code_is_read_from_tracking_block() {
        let results: SearchResults = serde_json::from_value(json!({
            "results": [{"id": 1, "slug": "a"}],
            "tracking": {"searchCode": "sc-1"}
        }))
        .expect("search results should parse");
        assert_eq!(results.search_code(), Some("sc-1"));
        assert_eq!(results.results.len(), 1);
    }

    #[test]
    fn test_tracking_payload_requires_click_code() {
        let tracking = ContentTracking::default();
        assert!(tracking.to_payload().is_none());

        let tracking = ContentTracking {
            click_code: Some("ck".to_string()),
            rate_code: None,
        };
        assert!(matches!(
            tracking.to_payload(),
            Some(TrackingPayload::Click(ClickTracking { ref click_code, .. })) if click_code == "ck"
        ));
    }
}
