//! TOTP multi-factor authentication endpoints.

use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tracing::info;

use crate::api::error::ErrorKind;
use crate::totp::TotpEngine;

use super::principal::require_user;
use super::storage::{
    TokenPurpose, consume_token, lookup_user_by_id, peek_token_user, set_totp_secret,
};
use super::types::{MfaEnrollResponse, MfaVerifyRequest, OkResponse};
use super::utils::hash_token;

/// Enroll (or re-enroll) TOTP for the authenticated account.
///
/// Re-enrollment overwrites the stored secret, so any previously paired
/// authenticator stops working immediately.
#[utoipa::path(
    post,
    path = "/auth/mfa/totp/enroll",
    responses(
        (status = 200, description = "Secret generated", body = MfaEnrollResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "mfa"
)]
pub async fn enroll(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    totp_engine: Extension<TotpEngine>,
) -> Result<Response, ErrorKind> {
    let principal = require_user(&headers, &pool).await?;

    let secret = totp_engine
        .generate_secret()
        .map_err(ErrorKind::internal)?;
    set_totp_secret(&pool, principal.user.user_id, &secret)
        .await
        .map_err(ErrorKind::internal)?;

    let otpauth = totp_engine.provisioning_uri(&secret, &principal.user.email);
    info!(user_id = %principal.user.user_id, "TOTP secret enrolled");
    Ok(Json(MfaEnrollResponse { secret, otpauth }).into_response())
}

/// Validate a pending MFA challenge token against a submitted code.
///
/// The challenge token is issued by a login that passed the password check
/// but lacked a code. An invalid code leaves the token outstanding for a
/// retry; a valid code consumes it, and the consume is atomic so two
/// concurrent submissions cannot both succeed.
#[utoipa::path(
    post,
    path = "/auth/mfa/totp/verify",
    request_body = MfaVerifyRequest,
    responses(
        (status = 200, description = "Code accepted, challenge consumed", body = OkResponse),
        (status = 400, description = "Invalid challenge token or code")
    ),
    tag = "mfa"
)]
pub async fn verify(
    pool: Extension<PgPool>,
    totp_engine: Extension<TotpEngine>,
    payload: Option<Json<MfaVerifyRequest>>,
) -> Result<Response, ErrorKind> {
    let Some(Json(request)) = payload else {
        return Err(ErrorKind::InvalidInput("Missing payload".to_string()));
    };

    let token = request.mfa_token.trim();
    if token.is_empty() {
        return Err(ErrorKind::InvalidOrExpired);
    }
    let token_hash = hash_token(token);

    let Some(user_id) = peek_token_user(&pool, &token_hash, TokenPurpose::Mfa)
        .await
        .map_err(ErrorKind::internal)?
    else {
        return Err(ErrorKind::InvalidOrExpired);
    };

    let Some(user) = lookup_user_by_id(&pool, user_id)
        .await
        .map_err(ErrorKind::internal)?
    else {
        return Err(ErrorKind::InvalidOrExpired);
    };

    let Some(secret) = user.totp_secret.as_deref() else {
        return Err(ErrorKind::InvalidInput("Invalid code".to_string()));
    };

    let code_valid = totp_engine
        .verify_code(secret, &request.code)
        .map_err(ErrorKind::internal)?;
    if !code_valid {
        return Err(ErrorKind::InvalidInput("Invalid code".to_string()));
    }

    // Consume only after the code checks out; a concurrent consume of the
    // same challenge loses the race here and fails.
    let consumed = consume_token(&pool, &token_hash, TokenPurpose::Mfa)
        .await
        .map_err(ErrorKind::internal)?;
    if consumed.is_none() {
        return Err(ErrorKind::InvalidOrExpired);
    }

    info!(user_id = %user.user_id, "MFA challenge verified");
    Ok(Json(OkResponse { ok: true }).into_response())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{lazy_pool, totp_engine};
    use super::verify;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use crate::api::handlers::auth::types::MfaVerifyRequest;

    #[tokio::test]
    async fn verify_missing_payload() -> Result<()> {
        let response = verify(Extension(lazy_pool()?), Extension(totp_engine()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_empty_token() -> Result<()> {
        let response = verify(
            Extension(lazy_pool()?),
            Extension(totp_engine()),
            Some(Json(MfaVerifyRequest {
                mfa_token: "  ".to_string(),
                code: "123456".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
