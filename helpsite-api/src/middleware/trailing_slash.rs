//! Trailing slash handling.
//!
//! `GET /results/?query=x` is permanently redirected to `/results?query=x`.
//! Other methods are served in place with the slash removed, so a form or
//! beacon posting to `/tracking/` still lands on its handler.

use axum::{
    extract::Request,
    http::{header, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Path without its trailing slashes; `None` when there is nothing to strip.
///
/// Leading slashes collapse to one so the result is always a path on this
/// host: `//evil.example/` becomes `/evil.example`, never a
/// protocol-relative URL.
fn strip_trailing_slashes(path: &str) -> Option<String> {
    if path == "/" || !path.ends_with('/') {
        return None;
    }
    let trimmed = path
        .trim_end_matches('/')
        .trim_start_matches(|c: char| c == '/' || c == '\\');
    Some(format!("/{}", trimmed))
}

fn with_query(path: &str, uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    }
}

pub async fn trailing_slash_middleware(mut request: Request, next: Next) -> Response {
    let Some(stripped) = strip_trailing_slashes(request.uri().path()) else {
        return next.run(request).await;
    };
    let target = with_query(&stripped, request.uri());

    if request.method() == Method::GET || request.method() == Method::HEAD {
        tracing::debug!(from = %request.uri(), to = %target, "Redirecting to path without trailing slash");
        return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, target)]).into_response();
    }

    match target.parse::<Uri>() {
        Ok(uri) => {
            *request.uri_mut() = uri;
            next.run(request).await
        }
        Err(e) => ApiError::invalid_input(format!("Invalid request path: {}", e)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::post, Router};
    use tower::ServiceExt;

    #[test]
    fn test_strip_trailing_slashes() {
        assert_eq!(strip_trailing_slashes("/"), None);
        assert_eq!(strip_trailing_slashes("/results"), None);
        assert_eq!(strip_trailing_slashes("/results/").as_deref(), Some("/results"));
        assert_eq!(strip_trailing_slashes("/contents/a//").as_deref(), Some("/contents/a"));
        assert_eq!(strip_trailing_slashes("//").as_deref(), Some("/"));
        assert_eq!(strip_trailing_slashes("//evil.example/").as_deref(), Some("/evil.example"));
        assert_eq!(strip_trailing_slashes("/\\evil.example/").as_deref(), Some("/evil.example"));
    }

    fn app() -> Router {
        let inner = Router::new()
            .route("/results", axum::routing::get(|| async { "results" }))
            .route("/tracking", post(|| async { "tracked" }));
        Router::new()
            .fallback_service(inner)
            .layer(middleware::from_fn(trailing_slash_middleware))
    }

    #[tokio::test]
    async fn test_get_is_redirected_with_query() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/results/?query=reset")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should complete");

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/results?query=reset");
    }

    #[tokio::test]
    async fn test_redirect_never_leaves_the_host() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("//evil.example/")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should complete");

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        let location = response.headers()[header::LOCATION]
            .to_str()
            .expect("location should be text");
        assert_eq!(location, "/evil.example");
        assert!(!location.starts_with("//"));
    }

    #[tokio::test]
    async fn test_post_is_rewritten_in_place() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/tracking/")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should complete");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        assert_eq!(&body[..], b"tracked");
    }
}
