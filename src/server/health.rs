//! Liveness endpoint.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// `GET /health`: always `200 {"ok": true}` while the process serves.
pub async fn health_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "ok": true })))
}
