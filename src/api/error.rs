//! Request error taxonomy and HTTP status mapping.
//!
//! Handlers return `Result<_, ErrorKind>`; the `IntoResponse` impl renders a
//! small JSON body. Server-side failures are logged here and surfaced as an
//! opaque 500 so internal details never reach clients.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Malformed or policy-violating input (bad email, weak password).
    #[error("{0}")]
    InvalidInput(String),
    /// No session cookie, or the cookie does not match a stored session.
    #[error("Not authenticated")]
    Unauthenticated,
    /// The session row exists but its expiry has passed.
    #[error("Session expired")]
    SessionExpired,
    /// The session points at a user record that no longer exists.
    #[error("User not found")]
    UserNotFound,
    /// Undifferentiated login failure: unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The account has a TOTP secret and no valid code was submitted.
    #[error("MFA code required")]
    MfaRequired,
    #[error("Email not verified")]
    EmailNotVerified,
    /// Authenticated, but the role does not satisfy the requirement.
    #[error("Forbidden")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("CSRF check failed")]
    CsrfMismatch,
    #[error("Rate limit exceeded")]
    RateLimited,
    /// Single-use token is unknown, consumed, wrong-purpose, or expired.
    #[error("Invalid or expired token")]
    InvalidOrExpired,
    /// A stored password hash failed to parse as a PHC string.
    #[error("Corrupt credential record")]
    CorruptCredential,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ErrorKind {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::InvalidOrExpired => StatusCode::BAD_REQUEST,
            Self::Unauthenticated
            | Self::SessionExpired
            | Self::UserNotFound
            | Self::InvalidCredentials
            | Self::MfaRequired => StatusCode::UNAUTHORIZED,
            Self::EmailNotVerified | Self::Forbidden | Self::CsrfMismatch => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::CorruptCredential | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error payload, mirroring the shape clients already expect.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for ErrorKind {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self {
                Self::CorruptCredential => error!("Corrupt credential record"),
                Self::Internal(err) => error!("Internal error: {err:#}"),
                _ => {}
            }
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            ErrorKind::InvalidInput("weak".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorKind::InvalidOrExpired.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorKind::Unauthenticated.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorKind::SessionExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::UserNotFound.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorKind::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorKind::MfaRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorKind::EmailNotVerified.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ErrorKind::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::CsrfMismatch.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorKind::RateLimited.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorKind::CorruptCredential.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_errors_do_not_leak_detail() {
        let response = ErrorKind::internal(anyhow::anyhow!("pool exhausted")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn login_failures_are_undifferentiated() {
        // Unknown email and wrong password must render identically.
        assert_eq!(
            ErrorKind::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
    }
}
