//! Helpsite API - Server-Rendered Help Center
//!
//! Axum application serving a help center on top of a knowledge-management
//! API: home, category, content and search result pages, autocomplete and
//! tracking endpoints, plus the sitemap and robots files.
//!
//! Every page request goes through the same stack: the access token gate,
//! the visitor session and the language layer, in that order. See
//! [`routes::create_router`].

#[macro_use]
pub mod macros;

pub mod clients;
pub mod config;
pub mod error;
pub mod locale;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod urls;
pub mod views;

pub use config::{CacheBackendKind, HelpsiteConfig, Mode};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use locale::{LanguageManager, LocaleBundle};
pub use routes::create_router;
pub use state::AppState;
