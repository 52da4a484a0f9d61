//! Webhook endpoint.
//!
//! Parses the body, tags the delivery with a request id and hands it to a
//! background task. The response never waits for analysis.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use super::AppState;
use crate::event::{normalize, EventSource};

/// Errors returned to the webhook caller.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The body is not valid JSON.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidJson(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body of the `202 Accepted` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    /// Always `true`.
    pub received: bool,
    /// Detected CI system.
    pub source: EventSource,
}

/// `POST /webhook`.
///
/// - 202 Accepted: payload queued for processing
/// - 400 Bad Request: body is not JSON
/// - 413 Payload Too Large: body above `server.max_body_bytes`
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), WebhookError> {
    let payload: Value = serde_json::from_slice(&body).inspect_err(|e| {
        warn!(error = %e, bytes = body.len(), "rejected webhook with invalid JSON");
    })?;

    let event = normalize(&payload);
    let request_id = Uuid::new_v4();
    let span = info_span!("webhook", %request_id, source = %event.source);
    span.in_scope(|| {
        info!(
            url = ?event.url,
            status = ?event.status,
            log_len = event.logs.len(),
            "webhook received"
        );
    });

    app_state.dispatch(payload, span);

    Ok((
        StatusCode::ACCEPTED,
        Json(WebhookAck {
            received: true,
            source: event.source,
        }),
    ))
}
