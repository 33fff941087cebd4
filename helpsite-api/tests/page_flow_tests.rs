//! End-to-end page flows through the full router.
//!
//! A visitor searches, follows a result and rates it; the KM API double
//! records every call so the tests can check which events were reported
//! and that the token and the tracking session are reused across requests.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use helpsite_api::{create_router, AppState, HelpsiteConfig, LocaleBundle};
use helpsite_core::{AuthApi, KnowledgeApiFactory, TrackingEvent, UpstreamError};
use helpsite_storage::CacheStore;
use helpsite_test_utils::{fixtures, InMemoryCacheBackend, MockAuthApi, MockKnowledgeApi};
use proptest::prelude::*;
use tower::ServiceExt;

// ============================================================================
// TEST HARNESS
// ============================================================================

struct TestSite {
    app: Router,
    km: MockKnowledgeApi,
    auth: MockAuthApi,
}

impl TestSite {
    fn new(km: MockKnowledgeApi) -> Self {
        Self::with_auth(km, MockAuthApi::new())
    }

    fn with_auth(km: MockKnowledgeApi, auth: MockAuthApi) -> Self {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCacheBackend::new());
        let auth_api: Arc<dyn AuthApi> = Arc::new(auth.clone());
        let factory: Arc<dyn KnowledgeApiFactory> = Arc::new(km.clone());
        let config = HelpsiteConfig {
            base_url: Some("https://help.test".to_string()),
            ..Default::default()
        };
        let state = AppState::new(
            config,
            cache,
            auth_api,
            factory,
            LocaleBundle::load("en", None).expect("embedded locale should load"),
        );
        Self {
            app: create_router(state),
            km,
            auth,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("request should complete")
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request should build"))
            .await
    }
}

/// The `name=value` part of the session cookie set on `response`.
fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .expect("response should set the session cookie")
        .to_string()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    String::from_utf8_lossy(&bytes).into_owned()
}

// ============================================================================
// FLOWS
// ============================================================================

#[tokio::test]
async fn test_result_click_is_reported_once() {
    let site = TestSite::new(fixtures::knowledge_base());

    let home = site.get("/", None).await;
    assert_eq!(home.status(), StatusCode::OK);
    let cookie = session_cookie(&home);

    let results = site.get("/results?query=reset", Some(&cookie)).await;
    assert_eq!(results.status(), StatusCode::OK);
    assert!(results.headers().get(header::SET_COOKIE).is_none());
    let page = body_text(results).await;
    assert!(page.contains("https://help.test/contents/reset-password?t=r"));
    assert!(page.contains("search-code-1"));

    let content = site
        .get("/contents/reset-password?t=r", Some(&cookie))
        .await;
    assert_eq!(content.status(), StatusCode::OK);
    let article = body_text(content).await;
    assert!(article.contains("Answer for Reset your password"));
    assert!(article.contains("Enable two-factor login"));

    assert_eq!(
        site.km.events(),
        vec![TrackingEvent::click("search-click-reset-password")]
    );
    assert_eq!(site.km.sessions_created(), 1);
    assert_eq!(site.auth.auth_calls(), 1);
}

#[tokio::test]
async fn test_direct_visit_reports_the_content_click_code() {
    let site = TestSite::new(fixtures::knowledge_base());

    let response = site.get("/contents/invoices", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(site.km.events(), vec![TrackingEvent::click("click-invoices")]);
}

#[tokio::test]
async fn test_autocomplete_click_reports_the_query() {
    let suggestion = fixtures::content(10, "reset-password", "Reset your password");
    let site = TestSite::new(fixtures::knowledge_base().with_autocomplete(vec![suggestion]));

    let response = site.get("/autocomplete?query=res", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    let suggestions: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("suggestions are JSON");
    assert_eq!(
        suggestions[0]["seoFriendlyUrl"],
        "https://help.test/contents/reset-password?t=a"
    );

    let content = site
        .get("/contents/reset-password?t=a", Some(&cookie))
        .await;
    assert_eq!(content.status(), StatusCode::OK);
    assert_eq!(
        site.km.events(),
        vec![TrackingEvent::autocompleter_click("res", 10)]
    );
}

#[tokio::test]
async fn test_rating_beacon_posted_with_trailing_slash() {
    let site = TestSite::new(fixtures::knowledge_base());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/tracking/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"type": "rate", "code": "rate-invoices", "value": 2, "comment": "outdated"}"#,
        ))
        .expect("request should build");
    let response = site.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        site.km.events(),
        vec![TrackingEvent::coded(
            "rate",
            "rate-invoices",
            Some("2".to_string()),
            Some("outdated".to_string()),
        )]
    );
}

#[tokio::test]
async fn test_category_page_lists_its_contents() {
    let site = TestSite::new(fixtures::knowledge_base());

    let response = site.get("/categories/passwords", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("https://help.test/contents/reset-password?t=cc"));
    assert!(page.contains("https://help.test/categories/security"));
}

#[tokio::test]
async fn test_unknown_pages_are_not_found() {
    let site = TestSite::new(fixtures::knowledge_base());

    let content = site.get("/contents/no-such-article", None).await;
    assert_eq!(content.status(), StatusCode::NOT_FOUND);

    let category = site.get("/categories/no-such-category", None).await;
    assert_eq!(category.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_visit_tracking_fails_the_page() {
    let km = fixtures::knowledge_base().failing_on(
        "track",
        UpstreamError::Status {
            api: "km".to_string(),
            endpoint: "/tracking/events".to_string(),
            status: 503,
            body: String::new(),
        },
    );
    let site = TestSite::new(km);

    let response = site.get("/contents/invoices", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("Something went wrong"));
    assert_eq!(site.km.call_count("track"), 1);
}

#[tokio::test]
async fn test_missing_app_data_is_a_server_error() {
    let km = fixtures::knowledge_base().failing_on(
        "app_data",
        UpstreamError::NotFound {
            api: "km".to_string(),
            endpoint: "/app/data".to_string(),
        },
    );
    let site = TestSite::new(km);

    let response = site.get("/", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_search_without_query_fails() {
    let site = TestSite::new(fixtures::knowledge_base());
    let response = site.get("/results", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_sitemap_is_built_once() {
    let site = TestSite::new(fixtures::knowledge_base());

    let first = site.get("/sitemap.xml", None).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        first
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/xml")
    );
    let xml = body_text(first).await;
    assert!(xml.contains("<loc>https://help.test/contents/invoices</loc>"));
    assert!(xml.contains("<loc>https://help.test/categories/passwords</loc>"));

    let contents_calls = site.km.call_count("contents");
    let second = site.get("/sitemap.xml", None).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(site.km.call_count("contents"), contents_calls);
}

#[tokio::test]
async fn test_short_lived_token_is_refreshed_on_next_request() {
    let auth = MockAuthApi::new().with_lifetime_secs(60);
    let site = TestSite::with_auth(fixtures::knowledge_base(), auth);

    let first = site.get("/", None).await;
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = session_cookie(&first);

    let second = site.get("/categories/billing", Some(&cookie)).await;
    assert_eq!(second.status(), StatusCode::OK);

    assert_eq!(site.auth.auth_calls(), 1);
    assert_eq!(site.auth.refreshed_tokens(), vec!["token-1".to_string()]);
    let tokens: Vec<String> = site
        .km
        .credentials()
        .iter()
        .map(|credentials| credentials.access_token.clone())
        .collect();
    assert!(tokens.contains(&"refreshed-1".to_string()));
}

#[tokio::test]
async fn test_robots_follows_indexing_setting() {
    let site = TestSite::new(MockKnowledgeApi::new());

    let response = site.get("/robots.txt", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "User-agent: *\nDisallow: /\nSitemap: https://help.test/sitemap.xml\n"
    );
    assert_eq!(site.auth.auth_calls(), 0);
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Any GET path ending in slashes redirects to the same path without them.
    #[test]
    fn prop_trailing_slashes_redirect(
        segments in prop::collection::vec("[a-z0-9-]{1,10}", 1..4),
        slashes in 1usize..4,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let site = TestSite::new(MockKnowledgeApi::new());
            let path = format!("/{}", segments.join("/"));
            let response = site
                .get(&format!("{}{}", path, "/".repeat(slashes)), None)
                .await;

            prop_assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
            prop_assert_eq!(
                response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|value| value.to_str().ok()),
                Some(path.as_str())
            );
            prop_assert!(site.km.calls().is_empty());
            Ok(())
        })?;
    }
}
