//! Password reset flow.

use axum::{
    Json,
    extract::Extension,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::email::{self, Notifier};
use crate::api::error::ErrorKind;

use super::password::{hash_password, password_policy_ok};
use super::state::AuthState;
use super::storage::{TokenPurpose, issue_token, lookup_user_by_email, redeem_reset_token};
use super::types::{OkResponse, ResetConfirmRequest, ResetRequest};
use super::utils::{build_reset_url, hash_token, valid_email};

/// Start a password reset. The response is 200 regardless of whether the
/// email is registered, so the endpoint cannot be used to probe accounts.
#[utoipa::path(
    post,
    path = "/auth/reset",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Accepted; a reset link is sent if the account exists", body = OkResponse)
    ),
    tag = "auth"
)]
pub async fn reset_start(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    notifier: Extension<Arc<dyn Notifier>>,
    payload: Option<Json<ResetRequest>>,
) -> Result<Response, ErrorKind> {
    let Some(Json(request)) = payload else {
        return Err(ErrorKind::InvalidInput("Missing payload".to_string()));
    };

    let email_address = request.email.trim().to_string();
    if !valid_email(&email_address) {
        // Unknown and malformed addresses answer identically.
        return Ok(Json(OkResponse { ok: true }).into_response());
    }

    let user = lookup_user_by_email(&pool, &email_address)
        .await
        .map_err(ErrorKind::internal)?;
    if let Some(user) = user {
        let config = auth_state.config();
        let token = issue_token(
            &pool,
            user.user_id,
            TokenPurpose::Reset,
            config.reset_token_ttl_seconds(),
        )
        .await
        .map_err(ErrorKind::internal)?;
        let link = build_reset_url(config.frontend_base_url(), &token);
        let minutes = config.reset_token_ttl_seconds() / 60;
        email::dispatch(
            notifier.0.clone(),
            email_address,
            "Reset your PolyLab password".to_string(),
            format!(
                "A password reset was requested for your account.\n\nChoose a new password here:\n\n  {link}\n\nThe link expires in {minutes} minutes. If you did not request this, ignore this message.\n"
            ),
        );
        info!(user_id = %user.user_id, "password reset link issued");
    }

    Ok(Json(OkResponse { ok: true }).into_response())
}

/// Complete a reset: weak passwords are rejected before the token is
/// consumed, so a rejected attempt does not burn the link.
#[utoipa::path(
    post,
    path = "/auth/reset/confirm",
    request_body = ResetConfirmRequest,
    responses(
        (status = 200, description = "Password replaced", body = OkResponse),
        (status = 400, description = "Weak password or invalid/expired token")
    ),
    tag = "auth"
)]
pub async fn reset_confirm(
    pool: Extension<PgPool>,
    payload: Option<Json<ResetConfirmRequest>>,
) -> Result<Response, ErrorKind> {
    let Some(Json(request)) = payload else {
        return Err(ErrorKind::InvalidInput("Missing payload".to_string()));
    };

    if !password_policy_ok(&request.new_password) {
        return Err(ErrorKind::InvalidInput("Weak password".to_string()));
    }

    let token = request.token.trim();
    if token.is_empty() {
        return Err(ErrorKind::InvalidOrExpired);
    }

    let new_password = request.new_password;
    let new_hash = tokio::task::spawn_blocking(move || hash_password(&new_password))
        .await
        .map_err(ErrorKind::internal)?
        .map_err(ErrorKind::internal)?;

    let token_hash = hash_token(token);
    let redeemed = redeem_reset_token(&pool, &token_hash, &new_hash)
        .await
        .map_err(ErrorKind::internal)?;
    if !redeemed {
        return Err(ErrorKind::InvalidOrExpired);
    }

    info!("password reset completed");
    Ok(Json(OkResponse { ok: true }).into_response())
}
