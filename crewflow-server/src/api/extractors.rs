//! Custom Axum extractors for request authentication.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Header carrying the plaintext admin secret.
pub const ADMIN_AUTH_HEADER: &str = "X-CrewFlow-Admin-Authorization";

/// An Axum extractor that authenticates admin requests.
///
/// The header value is compared against the configured admin secret in
/// constant time via `ring::constant_time`.
pub struct AdminAuth;

/// Errors returned by the [`AdminAuth`] extractor.
#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidSecret,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminAuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "missing X-CrewFlow-Admin-Authorization header",
            ),
            AdminAuthError::InvalidSecret => {
                (StatusCode::UNAUTHORIZED, "admin authentication failed")
            }
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidSecret)?;

        let admin = state.config.admin.read().await;
        ring::constant_time::verify_slices_are_equal(
            provided.as_bytes(),
            admin.secret_bytes(),
        )
        .map_err(|_| AdminAuthError::InvalidSecret)?;

        Ok(AdminAuth)
    }
}
