//! Per-visitor session state.

use serde::{Deserialize, Serialize};

use crate::tracking::TrackingMap;

/// Visitor session, stored in the cache between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// KM tracking session token, once one has been opened for this visitor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default)]
    pub tracking: TrackingMap,
}
