//! API handlers

pub mod activity;
pub mod logs;
pub mod repartition;
pub mod root;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use historydb::{ActivityKey, EngineError};

use crate::models::ErrorResponse;

/// Handler failure: a malformed request or an engine error.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Engine(EngineError),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Engine(e) if e.is_invalid_argument() => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Engine(e) => {
                tracing::error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Non-empty `key`, else the day bucket of `timestamp`.
pub(crate) fn activity_key(key: Option<String>, timestamp: Option<u64>) -> Result<ActivityKey, ApiError> {
    match (key.filter(|k| !k.is_empty()), timestamp) {
        (Some(key), _) => Ok(ActivityKey::Named(key)),
        (None, Some(timestamp)) => Ok(ActivityKey::Time(timestamp)),
        (None, None) => Err(ApiError::BadRequest(
            "either 'key' or 'timestamp' is required".to_string(),
        )),
    }
}

pub(crate) fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("required parameter '{}' is missing", name)))
}

pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
