//! Bearer token lifecycle.

use serde::{Deserialize, Serialize};

/// Tokens closer than this to their expiration are refreshed.
pub const REFRESH_WINDOW_SECS: i64 = 300;

/// Cached access token for the KM API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Unix timestamp, in seconds.
    pub expiration: i64,
    /// KM API base URL handed out when the token was issued.
    pub km_api_base_url: String,
}

impl AccessToken {
    pub fn seconds_left(&self, now: i64) -> i64 {
        self.expiration - now
    }

    pub fn has_expired(&self, now: i64) -> bool {
        self.seconds_left(now) <= 0
    }

    pub fn needs_refresh(&self, now: i64) -> bool {
        self.seconds_left(now) < REFRESH_WINDOW_SECS
    }
}

/// What the authentication gate has to do before a request proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDecision {
    /// No usable token: authenticate with key and secret.
    Issue,
    /// Token still valid but close to expiring: refresh it.
    Refresh,
    /// Token valid for long enough.
    Reuse,
}

impl TokenDecision {
    pub fn for_token(token: Option<&AccessToken>, now: i64) -> Self {
        match token {
            None => TokenDecision::Issue,
            Some(token) if token.has_expired(now) => TokenDecision::Issue,
            Some(token) if token.needs_refresh(now) => TokenDecision::Refresh,
            Some(_) => TokenDecision::Reuse,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenDecision::Issue => "issue",
            TokenDecision::Refresh => "refresh",
            TokenDecision::Reuse => "reuse",
        }
    }
}
