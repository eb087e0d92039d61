//! HTTP route handlers.

pub(crate) mod contact;
pub(crate) mod mock;
pub(crate) mod workflows;

use crate::error::{ApiError, FieldIssue};
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

/// Success envelope: `{success: true, data}`.
pub(crate) fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Success envelope with `201 Created`.
pub(crate) fn created<T: Serialize>(data: T) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, ok(data))
}

/// Decode an optional JSON body; an empty body yields the default value.
pub(crate) fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| ApiError::Validation {
        message: "Invalid JSON body".to_string(),
        details: vec![FieldIssue::new("body", err.to_string())],
    })
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> ApiError {
    ApiError::NotFound("not found".to_string())
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "workflows": state.registry.len(),
    });
    (StatusCode::OK, Json(response))
}
