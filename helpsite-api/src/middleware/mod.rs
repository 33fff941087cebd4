//! Middleware modules for the helpsite
//!
//! - `trailing_slash`: canonical URLs without a trailing slash
//! - `auth`: access token gate for the KM API
//! - `session`: visitor session and KM tracking session
//! - `language`: labels and category metadata for the request
//! - `extractors`: typed access to what the layers above inject
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/", get(home))
//!     // Innermost: needs the session-bound KM client
//!     .layer(middleware::from_fn_with_state(state.clone(), language_middleware))
//!     // Needs the credentials resolved by the token gate
//!     .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
//!     // Outermost
//!     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
//! ```

mod auth;
mod extractors;
mod language;
mod session;
mod trailing_slash;

pub use auth::{auth_middleware, resolve_access_token, ACCESS_TOKEN_KEY};
pub use extractors::{Km, Lang, PageContext};
pub use language::{language_middleware, APP_DATA_ID, CATEGORIES_METADATA_KEY, LABELS_KEY};
pub use session::{
    session_cache_key, session_middleware, RequestSession, SESSION_COOKIE, USER_INFO_MARKER,
};
pub use trailing_slash::trailing_slash_middleware;
