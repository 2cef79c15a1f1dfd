//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::session::LiveRaceError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or wrong admin password (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Upstream timing feed unavailable (502)
    #[error("Upstream unavailable: {0}")]
    BadGateway(String),

    /// xcd-common error
    #[error("Common error: {0}")]
    Common(#[from] xcd_common::Error),
}

impl From<LiveRaceError> for ApiError {
    fn from(err: LiveRaceError) -> Self {
        match err {
            LiveRaceError::InvalidFeedUrl(_) => ApiError::BadRequest(err.to_string()),
            LiveRaceError::DraftNotFound(_)
            | LiveRaceError::NotTracking(_)
            | LiveRaceError::TeamNotFound { .. } => ApiError::NotFound(err.to_string()),
            LiveRaceError::FeedUnavailable(_) => ApiError::BadGateway(err.to_string()),
            LiveRaceError::Roster(e) => ApiError::Common(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "FEED_UNAVAILABLE", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
