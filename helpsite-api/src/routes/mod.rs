//! Route table.
//!
//! Page routes sit behind the request pipeline: access token, then session,
//! then language. `robots.txt` and `/metrics` skip it, so crawlers and
//! scrapers never touch the KM API.

use axum::{
    http::Uri,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::middleware::{
    auth_middleware, language_middleware, session_middleware, trailing_slash_middleware,
};
use crate::pages::{autocomplete, categories, contents, home, results, robots, sitemap, tracking};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No page at {}", uri.path()))
}

fn page_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home_page))
        .route("/categories", get(categories::categories_index))
        .route("/categories/*slug", get(categories::category))
        .route("/contents/*slug", get(contents::content_page))
        .route("/results", get(results::results_page))
        .route("/autocomplete", get(autocomplete::autocomplete))
        .route("/tracking", post(tracking::track))
        .route("/sitemap.xml", get(sitemap::sitemap))
        // Last layer runs first.
        .layer(from_fn_with_state(state.clone(), language_middleware))
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// Build the complete application router.
///
/// Trailing slashes are handled before routing, on the outer router, so
/// `/results/` never reaches the fallback.
pub fn create_router(state: AppState) -> Router {
    let app = page_routes(&state)
        .route("/robots.txt", get(robots::robots))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
        .with_state(state);

    Router::new()
        .fallback_service(app)
        .layer(from_fn(trailing_slash_middleware))
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
}
