//! Account signup.

use axum::{Json, extract::Extension, response::IntoResponse, response::Response};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::email::Notifier;
use crate::api::error::ErrorKind;

use super::password::{hash_password, password_policy_ok};
use super::state::AuthState;
use super::storage::{SignupOutcome, insert_user};
use super::types::{OkResponse, SignupRequest};
use super::utils::valid_email;
use super::verification::send_verification_notice;

/// Create a new unverified student account and send the verification link.
///
/// Emails are stored case-sensitively, exactly as submitted (trimmed).
/// Uniqueness is enforced by the database at write time, so two concurrent
/// signups for one address cannot both succeed.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created, verification pending", body = OkResponse),
        (status = 400, description = "Invalid email, weak password, or duplicate email")
    ),
    tag = "auth"
)]
pub async fn signup(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    notifier: Extension<Arc<dyn Notifier>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<Response, ErrorKind> {
    let Some(Json(request)) = payload else {
        return Err(ErrorKind::InvalidInput("Missing payload".to_string()));
    };

    let email = request.email.trim().to_string();
    if !valid_email(&email) {
        return Err(ErrorKind::InvalidInput("Invalid email".to_string()));
    }
    if !password_policy_ok(&request.password) {
        return Err(ErrorKind::InvalidInput("Weak password".to_string()));
    }

    // Argon2 is deliberately slow; keep it off the async workers.
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ErrorKind::internal)?
        .map_err(ErrorKind::internal)?;

    let user_id = match insert_user(&pool, &email, &password_hash)
        .await
        .map_err(ErrorKind::internal)?
    {
        SignupOutcome::Created(user_id) => user_id,
        SignupOutcome::Conflict => {
            return Err(ErrorKind::InvalidInput(
                "Email already registered".to_string(),
            ));
        }
    };

    send_verification_notice(&pool, &notifier, auth_state.config(), user_id, &email)
        .await
        .map_err(ErrorKind::internal)?;

    info!(%user_id, "account created, verification pending");
    Ok(Json(OkResponse { ok: true }).into_response())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{lazy_pool, log_notifier, test_auth_state};
    use super::signup;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use crate::api::handlers::auth::types::SignupRequest;

    #[tokio::test]
    async fn signup_missing_payload() -> Result<()> {
        let response = signup(
            Extension(lazy_pool()?),
            Extension(test_auth_state()),
            Extension(log_notifier()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn signup_invalid_email() -> Result<()> {
        let response = signup(
            Extension(lazy_pool()?),
            Extension(test_auth_state()),
            Extension(log_notifier()),
            Some(Json(SignupRequest {
                email: "not-an-email".to_string(),
                password: "GoodPass1!".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn signup_weak_password() -> Result<()> {
        let response = signup(
            Extension(lazy_pool()?),
            Extension(test_auth_state()),
            Extension(log_notifier()),
            Some(Json(SignupRequest {
                email: "a@example.com".to_string(),
                password: "weak".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
