//! Visitor sessions.
//!
//! A visitor is identified by the [`SESSION_COOKIE`] cookie holding a UUID.
//! The [`Session`] itself lives in the cache under [`session_cache_key`],
//! expiring after the configured session TTL of inactivity.
//!
//! On the first request of a session a KM tracking session is opened and the
//! visitor reported; its token is then sent with every KM call of the
//! session. The middleware injects:
//! - [`RequestSession`]: shared handle on the session state
//! - `Arc<dyn KnowledgeApi>`: KM client bound to the session's credentials
//!
//! The session is written back once the handler has run.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use helpsite_core::{KmCredentials, KnowledgeApi, Session, TrackingMap};
use helpsite_storage::CacheStoreExt;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "helpsite_session";

/// User info reported when a KM tracking session is opened.
pub const USER_INFO_MARKER: &str = "generate_session";

/// Cache key of the session `id`.
pub fn session_cache_key(id: &Uuid) -> String {
    format!("session:{}", id)
}

/// Value of the session cookie, if the request carries a well-formed one.
fn session_id_from_cookies(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

fn session_cookie(id: &Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; Secure; SameSite=Lax", SESSION_COOKIE, id)
}

/// Handle on the current visitor session, shared between the middleware and
/// the page handler.
#[derive(Debug, Clone)]
pub struct RequestSession {
    id: Uuid,
    state: Arc<Mutex<Session>>,
}

impl RequestSession {
    pub fn new(id: Uuid, session: Session) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(session)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Tracking state as stored before the current page merged its own.
    pub async fn tracking(&self) -> TrackingMap {
        self.state.lock().await.tracking.clone()
    }

    /// Merge what the current page tracked into the session.
    pub async fn merge_tracking(&self, tracking: TrackingMap) {
        self.state.lock().await.tracking.merge(tracking);
    }

    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.clone()
    }
}

/// Open a KM tracking session if `session` has none yet, and return the KM
/// client bound to it.
async fn bind_tracking_session(
    state: &AppState,
    credentials: KmCredentials,
    session: &mut Session,
) -> ApiResult<Arc<dyn KnowledgeApi>> {
    if let Some(token) = &session.session_token {
        tracing::debug!("Using existing tracking session");
        return Ok(state.km.connect(credentials.with_session_token(token.clone())));
    }

    tracing::debug!("Creating a new tracking session");
    let session_token = state.km.connect(credentials.clone()).create_session().await?;
    let km = state
        .km
        .connect(credentials.with_session_token(session_token.clone()));
    km.track_user_info(json!({ "data": { "inbenta": USER_INFO_MARKER } }))
        .await?;
    session.session_token = Some(session_token);
    Ok(km)
}

/// Axum middleware loading the visitor session and binding the KM client to it.
///
/// Requires [`KmCredentials`] from the token gate.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = request
        .extensions()
        .get::<KmCredentials>()
        .cloned()
        .ok_or_else(|| {
            ApiError::internal_error(
                "KM credentials not found in request extensions. \
                 Ensure auth_middleware is applied to this route.",
            )
        })?;

    let existing = match session_id_from_cookies(request.headers()) {
        Some(id) => state
            .cache
            .get_as::<Session>(&session_cache_key(&id))
            .await
            .into_option()
            .map(|session| (id, session)),
        None => None,
    };
    let is_new = existing.is_none();
    let (id, mut session) = existing.unwrap_or_else(|| (Uuid::now_v7(), Session::default()));

    let km = bind_tracking_session(&state, credentials, &mut session).await?;
    let handle = RequestSession::new(id, session);
    request.extensions_mut().insert(handle.clone());
    request.extensions_mut().insert(km);

    let mut response = next.run(request).await;

    let session = handle.snapshot().await;
    if let Err(e) = state
        .cache
        .set_as(&session_cache_key(&id), &session, Some(state.config.session_ttl))
        .await
    {
        tracing::warn!(session_id = %id, error = %e, "Failed to persist session");
    }

    if is_new {
        match HeaderValue::from_str(&session_cookie(&id)) {
            Ok(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Err(e) => tracing::warn!(error = %e, "Invalid session cookie"),
        }
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpsite_core::{ClickTracking, TrackingPayload};

    #[test]
    fn test_session_id_from_cookies() {
        let id = Uuid::now_v7();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", SESSION_COOKIE, id))
                .expect("header should build"),
        );
        assert_eq!(session_id_from_cookies(&headers), Some(id));

        let mut malformed = HeaderMap::new();
        malformed.insert(
            header::COOKIE,
            HeaderValue::from_static("helpsite_session=not-a-uuid"),
        );
        assert_eq!(session_id_from_cookies(&malformed), None);
        assert_eq!(session_id_from_cookies(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let id = Uuid::now_v7();
        let cookie = session_cookie(&id);
        assert!(cookie.starts_with(&format!("helpsite_session={}", id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[tokio::test]
    async fn test_merge_tracking_is_visible_in_snapshot() {
        let handle = RequestSession::new(Uuid::now_v7(), Session::default());
        let mut page = TrackingMap::new();
        page.record(
            "p",
            "reset-password",
            TrackingPayload::Click(ClickTracking {
                click_code: "click-1".to_string(),
                rate_code: None,
            }),
        );

        assert!(handle.tracking().await.is_empty());
        handle.clone().merge_tracking(page).await;
        assert!(handle.snapshot().await.tracking.lookup("p", "reset-password").is_some());
    }
}
