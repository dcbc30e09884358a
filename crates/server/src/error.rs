#![forbid(unsafe_code)]

use ax_nerve::CenterError;
use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};

pub(crate) fn status_for(err: &CenterError) -> StatusCode {
    match err.code() {
        "NOT_CONFIGURED" => StatusCode::SERVICE_UNAVAILABLE,
        "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        "CONFLICT" => StatusCode::CONFLICT,
        "INVALID_INPUT" => StatusCode::BAD_REQUEST,
        "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Development bodies carry the message; production bodies carry only the
/// stable category string. Neither carries stack traces or paths.
pub(crate) fn fail(production: bool, err: &CenterError) -> (StatusCode, Json<Value>) {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::warn!(code = err.code(), error = %err, "request failed");
    }
    let body = if production {
        json!({ "error": err.code() })
    } else {
        json!({ "error": err.to_string() })
    };
    (status, Json(body))
}

pub(crate) fn bad_request(production: bool, message: &str) -> (StatusCode, Json<Value>) {
    fail(production, &CenterError::bad_request(message))
}
