//! Helpsite Core - Domain Types
//!
//! Contents, categories, sessions and tracking state shared by the storage
//! and API crates, plus the traits the upstream API clients implement.
//! Nothing here performs I/O.

pub mod breadcrumb;
pub mod category;
pub mod content;
pub mod error;
pub mod lenient;
pub mod session;
pub mod token;
pub mod tracking;
pub mod upstream;

pub use breadcrumb::{Breadcrumb, Crumb};
pub use category::{
    build_tree, find_category, group_by_parent, subcategory_rows, Category, CategoryNode,
    ParentId, ROOT_CATEGORY_ID,
};
pub use content::{
    Content, ContentPage, ContentTracking, SearchResults, SearchTracking, ANSWER_TEXT,
    META_DESCRIPTION_MAX_CHARS,
};
pub use error::{ConfigError, StorageError, UpstreamError};
pub use session::Session;
pub use token::{AccessToken, TokenDecision, REFRESH_WINDOW_SECS};
pub use tracking::{
    related_key, AutocompleteTracking, ClickTracking, TrackingEvent, TrackingEventData,
    TrackingMap, TrackingPayload, EVENT_AUTOCOMPLETER_CLICK, EVENT_CLICK,
};
pub use upstream::{
    AuthApi, AuthGrant, GrantedApis, KmCredentials, KnowledgeApi, KnowledgeApiFactory,
    RefreshedToken, UpstreamResult,
};
