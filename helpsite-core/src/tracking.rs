//! Click attribution state and tracking events.
//!
//! Pages that list contents stash one [`TrackingPayload`] per listed slug under
//! a short tracking key and tag each link with `?t={key}`. When the visitor
//! opens one of those links, the content page looks the payload back up and
//! emits the matching [`TrackingEvent`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tracking key for the content page itself.
pub const KEY_CONTENT: &str = "c";
/// Tracking key for search results.
pub const KEY_RESULTS: &str = "r";
/// Tracking key for the popular contents block.
pub const KEY_POPULAR: &str = "p";
/// Tracking key for contents listed under a category.
pub const KEY_CATEGORY_CONTENTS: &str = "cc";
/// Tracking key for autocomplete suggestions.
pub const KEY_AUTOCOMPLETE: &str = "a";

/// Tracking key used for the related contents of items listed under `key`.
pub fn related_key(key: &str) -> String {
    format!("r{}", key)
}

/// Tracking codes of a content reached through a regular link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickTracking {
    pub click_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_code: Option<String>,
}

/// Query and content of an autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteTracking {
    pub query: String,
    pub content_id: i64,
}

/// What to report when a tracked link is followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TrackingPayload {
    Click(ClickTracking),
    Autocomplete(AutocompleteTracking),
}

/// Tracking key → content slug → payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingMap(BTreeMap<String, BTreeMap<String, TrackingPayload>>);

impl TrackingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `key` as produced by the current page, even if no slug ends up
    /// recorded under it. Merging then replaces whatever was stored before.
    pub fn declare(&mut self, key: &str) {
        self.0.entry(key.to_string()).or_default();
    }

    /// Record the payload for `slug` under `key`.
    pub fn record(&mut self, key: &str, slug: &str, payload: TrackingPayload) {
        self.0
            .entry(key.to_string())
            .or_default()
            .insert(slug.to_string(), payload);
    }

    /// Merge `other` into `self`.
    ///
    /// Every key present in `other` replaces the key wholesale; keys absent
    /// from `other` are left untouched.
    pub fn merge(&mut self, other: TrackingMap) {
        for (key, entries) in other.0 {
            self.0.insert(key, entries);
        }
    }

    pub fn lookup(&self, key: &str, slug: &str) -> Option<&TrackingPayload> {
        self.0.get(key).and_then(|entries| entries.get(slug))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn entries(&self, key: &str) -> Option<&BTreeMap<String, TrackingPayload>> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Event type reported when a content link is followed.
pub const EVENT_CLICK: &str = "click";
/// Event type reported when an autocomplete suggestion is followed.
pub const EVENT_AUTOCOMPLETER_CLICK: &str = "autocompleter_click";

/// Payload of a KM tracking event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackingEventData {
    Coded {
        code: String,
        value: Option<String>,
        comment: Option<String>,
    },
    Query {
        query: String,
        #[serde(rename = "contentId")]
        content_id: i64,
    },
}

/// Event body posted to the KM tracking endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: TrackingEventData,
}

impl TrackingEvent {
    /// Event carrying a tracking code, with optional value and comment (ratings).
    pub fn coded(
        event_type: impl Into<String>,
        code: impl Into<String>,
        value: Option<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            data: TrackingEventData::Coded {
                code: code.into(),
                value,
                comment,
            },
        }
    }

    pub fn click(code: impl Into<String>) -> Self {
        Self::coded(EVENT_CLICK, code, None, None)
    }

    pub fn autocompleter_click(query: impl Into<String>, content_id: i64) -> Self {
        Self {
            event_type: EVENT_AUTOCOMPLETER_CLICK.to_string(),
            data: TrackingEventData::Query {
                query: query.into(),
                content_id,
            },
        }
    }

    /// The event attributing a followed link to where it came from.
    pub fn for_payload(payload: &TrackingPayload) -> Self {
        match payload {
            TrackingPayload::Click(click) => Self::click(click.click_code.clone()),
            TrackingPayload::Autocomplete(suggestion) => {
                Self::autocompleter_click(suggestion.query.clone(), suggestion.content_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn click(code: &str) -> TrackingPayload {
        TrackingPayload::Click(ClickTracking {
            click_code: code.to_string(),
            rate_code: None,
        })
    }

    #[test]
    fn test_merge_replaces_only_produced_keys() {
        let mut session = TrackingMap::new();
        session.record("r", "slug-a", click("old-a"));
        session.record("p", "slug-p", click("pop"));

        let mut page = TrackingMap::new();
        page.record("r", "slug-b", click("new-b"));
        page.declare("rr");
        session.merge(page);

        assert_eq!(session.lookup("r", "slug-b"), Some(&click("new-b")));
        assert_eq!(session.lookup("r", "slug-a"), None);
        assert_eq!(session.lookup("p", "slug-p"), Some(&click("pop")));
        assert!(session.entries("rr").is_some_and(|entries| entries.is_empty()));
    }

    #[test]
    fn test_related_key() {
        assert_eq!(related_key(KEY_RESULTS), "rr");
        assert_eq!(related_key(KEY_CONTENT), "rc");
        assert_eq!(related_key(KEY_CATEGORY_CONTENTS), "rcc");
    }

    #[test]
    fn test_payload_roundtrips_through_session_json() {
        let mut map = TrackingMap::new();
        map.record("r", "slug-a", click("ck-a"));
        map.record(
            "a",
            "slug-b",
            TrackingPayload::Autocomplete(AutocompleteTracking {
                query: "password".to_string(),
                content_id: 9,
            }),
        );

        let stored = serde_json::to_value(&map).expect("map should serialize");
        assert_eq!(stored["r"]["slug-a"]["source"], json!("click"));
        assert_eq!(stored["a"]["slug-b"]["source"], json!("autocomplete"));

        let restored: TrackingMap = serde_json::from_value(stored).expect("map should parse");
        assert_eq!(restored, map);
    }

    #[test]
    fn test_event_bodies_match_km_shape() {
        let event = TrackingEvent::click("ck-1");
        assert_eq!(
            serde_json::to_value(&event).expect("event should serialize"),
            json!({"type": "click", "data": {"code": "ck-1", "value": null, "comment": null}})
        );

        let event = TrackingEvent::autocompleter_click("reset", 4);
        assert_eq!(
            serde_json::to_value(&event).expect("event should serialize"),
            json!({"type": "autocompleter_click", "data": {"query": "reset", "contentId": 4}})
        );
    }

    #[test]
    fn test_event_for_payload_is_exhaustive() {
        assert_eq!(TrackingEvent::for_payload(&click("ck")).event_type, EVENT_CLICK);
        let suggestion = TrackingPayload::Autocomplete(AutocompleteTracking {
            query: "q".to_string(),
            content_id: 1,
        });
        assert_eq!(
            TrackingEvent::for_payload(&suggestion).event_type,
            EVENT_AUTOCOMPLETER_CLICK
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Keys not produced by a page survive any merge.
        #[test]
        fn prop_merge_preserves_foreign_keys(
            existing in proptest::collection::btree_map("[a-z]{1,3}", "[a-z-]{1,8}", 0..6),
            incoming in proptest::collection::btree_map("[a-z]{1,3}", "[a-z-]{1,8}", 0..6),
        ) {
            let mut session = TrackingMap::new();
            for (key, slug) in &existing {
                session.record(key, slug, click("old"));
            }
            let mut page = TrackingMap::new();
            for (key, slug) in &incoming {
                page.record(key, slug, click("new"));
            }

            session.merge(page);

            for (key, slug) in &existing {
                if !incoming.contains_key(key) {
                    prop_assert_eq!(session.lookup(key, slug), Some(&click("old")));
                }
            }
            for (key, slug) in &incoming {
                prop_assert_eq!(session.lookup(key, slug), Some(&click("new")));
            }
        }
    }
}
