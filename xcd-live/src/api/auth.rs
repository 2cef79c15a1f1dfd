//! Admin password middleware
//!
//! Applied to the mutating live-race routes only. Reads stay public so
//! spectators can follow the standings.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use xcd_common::api::{validate_admin_password, ADMIN_PASSWORD_HEADER};

use crate::error::ApiError;
use crate::AppState;

/// Reject requests whose `x-admin-password` header does not match.
///
/// An empty configured password disables the check.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = validate_admin_password(&state.admin_password, provided) {
        warn!(path = %request.uri().path(), error = %e, "Rejected admin request");
        return Err(ApiError::Unauthorized(e.to_string()));
    }

    Ok(next.run(request).await)
}
