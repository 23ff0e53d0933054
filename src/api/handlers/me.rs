//! Authenticated self-service endpoint.

use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;

use crate::api::error::ErrorKind;

use super::auth::principal::require_user;
use super::auth::types::UserResponse;

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The authenticated user's profile", body = UserResponse),
        (status = 401, description = "Missing, expired, or orphaned session")
    ),
    tag = "me"
)]
pub async fn get_me(headers: HeaderMap, pool: Extension<PgPool>) -> Result<Response, ErrorKind> {
    let principal = require_user(&headers, &pool).await?;
    let user = principal.user;
    Ok(Json(UserResponse {
        id: user.user_id.to_string(),
        email: user.email,
        role: user.role,
        email_verified: user.email_verified,
        created_at: user.created_at,
    })
    .into_response())
}
