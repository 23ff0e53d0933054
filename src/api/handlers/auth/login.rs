//! Login endpoint and its state machine.
//!
//! Flow Overview:
//! 1) Credentials: unknown email and wrong password fail identically.
//! 2) Email verification gates login itself, not session resolution.
//! 3) If a TOTP secret is enrolled, a valid current code is required. A
//!    missing code gets a 401 carrying a short-lived MFA challenge token.
//! 4) Success mints a session cookie and a fresh CSRF cookie.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ErrorKind;
use crate::totp::TotpEngine;

use super::csrf::csrf_cookie;
use super::password::verify_password;
use super::session::session_cookie;
use super::state::AuthState;
use super::storage::{TokenPurpose, insert_session, issue_token, lookup_user_by_email};
use super::types::{LoginRequest, MfaChallengeResponse, OkResponse};
use super::utils::{generate_token, valid_email};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session and CSRF cookies issued", body = OkResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Invalid credentials or missing/invalid MFA code"),
        (status = 403, description = "Email not verified")
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    totp_engine: Extension<TotpEngine>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ErrorKind> {
    let Some(Json(request)) = payload else {
        return Err(ErrorKind::InvalidInput("Missing payload".to_string()));
    };

    let email = request.email.trim().to_string();
    if !valid_email(&email) {
        return Err(ErrorKind::InvalidInput("Invalid email".to_string()));
    }

    let Some(user) = lookup_user_by_email(&pool, &email)
        .await
        .map_err(ErrorKind::internal)?
    else {
        return Err(ErrorKind::InvalidCredentials);
    };

    let password = request.password;
    let password_hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(ErrorKind::internal)??;
    if !valid {
        return Err(ErrorKind::InvalidCredentials);
    }

    if !user.email_verified {
        return Err(ErrorKind::EmailNotVerified);
    }

    if let Some(secret) = &user.totp_secret {
        let code = request
            .totp
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());
        match code {
            None => {
                // Password checked out but the second factor is missing:
                // hand back a challenge token for /auth/mfa/totp/verify.
                let mfa_token = issue_token(
                    &pool,
                    user.user_id,
                    TokenPurpose::Mfa,
                    auth_state.config().mfa_token_ttl_seconds(),
                )
                .await
                .map_err(ErrorKind::internal)?;
                return Ok((
                    StatusCode::UNAUTHORIZED,
                    Json(MfaChallengeResponse {
                        detail: "MFA code required".to_string(),
                        mfa_token,
                    }),
                )
                    .into_response());
            }
            Some(code) => {
                let code_valid = totp_engine
                    .verify_code(secret, code)
                    .map_err(ErrorKind::internal)?;
                if !code_valid {
                    return Err(ErrorKind::MfaRequired);
                }
            }
        }
    }

    let session_token = insert_session(
        &pool,
        user.user_id,
        auth_state.config().session_ttl_seconds(),
    )
    .await
    .map_err(ErrorKind::internal)?;
    let csrf_token = generate_token().map_err(ErrorKind::internal)?;

    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        session_cookie(auth_state.config(), &session_token).map_err(ErrorKind::internal)?,
    );
    headers.append(
        SET_COOKIE,
        csrf_cookie(auth_state.config(), &csrf_token).map_err(ErrorKind::internal)?,
    );

    info!(user_id = %user.user_id, "login succeeded");
    Ok((StatusCode::OK, headers, Json(OkResponse { ok: true })).into_response())
}
