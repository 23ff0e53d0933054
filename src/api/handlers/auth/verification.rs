//! Email verification endpoints.

use anyhow::Result;
use axum::{
    Json,
    extract::{Extension, Query},
    response::{Html, IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::email::{self, Notifier};
use crate::api::error::ErrorKind;

use super::state::AuthConfig;
use super::storage::{TokenPurpose, issue_token, redeem_verification_token};
use super::types::{OkResponse, VerifyEmailQuery};
use super::utils::{build_verify_url, hash_token};

/// Issue a verification token and hand the link to the notifier.
///
/// Notification delivery is fire-and-forget: a failing sink is logged by the
/// dispatcher and never fails the calling flow.
pub(super) async fn send_verification_notice(
    pool: &PgPool,
    notifier: &Arc<dyn Notifier>,
    config: &AuthConfig,
    user_id: Uuid,
    recipient: &str,
) -> Result<()> {
    let token = issue_token(
        pool,
        user_id,
        TokenPurpose::Verify,
        config.verify_token_ttl_seconds(),
    )
    .await?;
    let link = build_verify_url(config.frontend_base_url(), &token);
    let minutes = config.verify_token_ttl_seconds() / 60;
    email::dispatch(
        notifier.clone(),
        recipient.to_string(),
        "Verify your PolyLab email".to_string(),
        format!(
            "Welcome to PolyLab!\n\nConfirm your email address by opening:\n\n  {link}\n\nThe link expires in {minutes} minutes. If you did not create this account, ignore this message.\n"
        ),
    );
    Ok(())
}

async fn redeem(pool: &PgPool, token: &str) -> Result<(), ErrorKind> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ErrorKind::InvalidInput("Missing token".to_string()));
    }
    let token_hash = hash_token(token);
    let verified = redeem_verification_token(pool, &token_hash)
        .await
        .map_err(ErrorKind::internal)?;
    if !verified {
        return Err(ErrorKind::InvalidOrExpired);
    }
    Ok(())
}

/// JSON variant used by the frontend.
#[utoipa::path(
    post,
    path = "/auth/verify-email",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified", body = OkResponse),
        (status = 400, description = "Invalid or expired token")
    ),
    tag = "auth"
)]
pub async fn verify_email(
    pool: Extension<PgPool>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Response, ErrorKind> {
    redeem(&pool, &query.token).await?;
    info!("email verified");
    Ok(Json(OkResponse { ok: true }).into_response())
}

/// Link clicked straight from the email: shows a small confirmation page
/// instead of a bare JSON response.
#[utoipa::path(
    get,
    path = "/auth/verify-email",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified, confirmation page"),
        (status = 400, description = "Invalid or expired token")
    ),
    tag = "auth"
)]
pub async fn verify_email_page(
    pool: Extension<PgPool>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Response, ErrorKind> {
    redeem(&pool, &query.token).await?;
    info!("email verified via link");
    Ok(Html(
        r#"<!doctype html>
<html>
  <head><title>Email verified</title></head>
  <body style="font-family: system-ui; text-align: center; margin-top: 4rem;">
    <h1>Email verified</h1>
    <p>You can now return to the PolyLab app and log in.</p>
  </body>
</html>
"#,
    )
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::lazy_pool;
    use super::{verify_email, verify_email_page};
    use anyhow::Result;
    use axum::extract::{Extension, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use crate::api::handlers::auth::types::VerifyEmailQuery;

    #[tokio::test]
    async fn verify_email_empty_token() -> Result<()> {
        let response = verify_email(
            Extension(lazy_pool()?),
            Query(VerifyEmailQuery {
                token: " ".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_page_empty_token() -> Result<()> {
        let response = verify_email_page(
            Extension(lazy_pool()?),
            Query(VerifyEmailQuery {
                token: String::new(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
