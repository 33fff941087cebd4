//! Tracking beacon.
//!
//! The page script posts `{type, code, value, comment}` here to rate a
//! content or a search; the event is forwarded to the KM API as is, with
//! missing fields sent as empty strings.

use axum::{body::Bytes, http::StatusCode};
use helpsite_core::TrackingEvent;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::middleware::Km;
use crate::urls::sanitize_special_chars;

#[derive(Debug, Default, Deserialize)]
pub struct TrackingBeacon {
    #[serde(rename = "type")]
    pub event_type: Option<Value>,
    pub code: Option<Value>,
    pub value: Option<Value>,
    pub comment: Option<Value>,
}

/// Text of a beacon field; ratings may arrive as numbers.
fn field_text(field: Option<&Value>) -> String {
    match field {
        Some(Value::String(text)) => sanitize_special_chars(text),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

impl TrackingBeacon {
    pub fn parse(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::invalid_input(format!("Invalid tracking payload: {}", e)))
    }

    /// The KM event for this beacon; a beacon without type is rejected.
    pub fn into_event(self) -> ApiResult<TrackingEvent> {
        let event_type = match self.event_type.as_ref() {
            None | Some(Value::Null) => return Err(ApiError::missing_parameter("type")),
            field => field_text(field),
        };
        Ok(TrackingEvent::coded(
            event_type,
            field_text(self.code.as_ref()),
            Some(field_text(self.value.as_ref())),
            Some(field_text(self.comment.as_ref())),
        ))
    }
}

/// `POST /tracking`
pub async fn track(Km(km): Km, body: Bytes) -> ApiResult<StatusCode> {
    let event = TrackingBeacon::parse(&body)?.into_event()?;
    tracing::debug!(event_type = %event.event_type, "Forwarding tracking beacon");
    km.track(&event).await?;
    Ok(StatusCode::OK)
}
