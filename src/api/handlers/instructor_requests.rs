//! Instructor-request submission and admin review.
//!
//! Flow Overview:
//! 1) A student submits a request with an optional note.
//! 2) Admins list requests, optionally filtered by status.
//! 3) Approving a request promotes the requester to instructor; rejecting
//!    only records the decision. Both are admin-only.
//!
//! Attachment storage stays outside this service; requests carry text only.

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::error::ErrorKind;

use super::auth::principal::{Role, RoleRequirement, require_role};

#[derive(Debug, Deserialize, ToSchema)]
pub struct InstructorRequestSubmit {
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstructorRequestResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub note: Option<String>,
    pub created_at: String,
    pub decided_by: Option<String>,
    pub decided_at: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRequestsQuery {
    /// Optional status filter: `pending`, `approved`, or `rejected`.
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_role: Option<Role>,
}

const REQUEST_COLUMNS: &str = r#"
    id::text AS id,
    user_id::text AS user_id,
    status,
    note,
    to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
    decided_by::text AS decided_by,
    CASE
        WHEN decided_at IS NULL THEN NULL
        ELSE to_char(decided_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"')
    END AS decided_at
"#;

fn row_to_response(row: &PgRow) -> InstructorRequestResponse {
    InstructorRequestResponse {
        id: row.get("id"),
        user_id: row.get("user_id"),
        status: row.get("status"),
        note: row.get("note"),
        created_at: row.get("created_at"),
        decided_by: row.get("decided_by"),
        decided_at: row.get("decided_at"),
    }
}

/// Submit an instructor request. Student accounts only; instructors and
/// admins have nothing to request.
#[utoipa::path(
    post,
    path = "/roles/requests",
    request_body = InstructorRequestSubmit,
    responses(
        (status = 200, description = "Request recorded", body = InstructorRequestResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a student account")
    ),
    tag = "instructor-requests"
)]
pub async fn submit_request(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    payload: Option<Json<InstructorRequestSubmit>>,
) -> Result<Response, ErrorKind> {
    let principal = require_role(&headers, &pool, RoleRequirement::Student).await?;

    let note = payload
        .and_then(|Json(request)| request.note)
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty());

    let query = format!(
        "INSERT INTO instructor_requests (user_id, note) VALUES ($1, $2) RETURNING {REQUEST_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(principal.user.user_id)
        .bind(note)
        .fetch_one(&pool.0)
        .instrument(span)
        .await
        .map_err(ErrorKind::internal)?;

    info!(user_id = %principal.user.user_id, "instructor request submitted");
    Ok(Json(row_to_response(&row)).into_response())
}

/// List instructor requests, newest first. Admin only.
#[utoipa::path(
    get,
    path = "/admin/roles/requests",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Requests, newest first", body = [InstructorRequestResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    ),
    tag = "instructor-requests"
)]
pub async fn list_requests(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Query(query_params): Query<ListRequestsQuery>,
) -> Result<Response, ErrorKind> {
    require_role(&headers, &pool, RoleRequirement::Admin).await?;

    // Unknown filter values fall back to the unfiltered listing.
    let status = query_params
        .status
        .as_deref()
        .filter(|status| matches!(*status, "pending" | "approved" | "rejected"));

    let rows = if let Some(status) = status {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM instructor_requests WHERE status = $1 ORDER BY created_at DESC"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query(&query)
            .bind(status)
            .fetch_all(&pool.0)
            .instrument(span)
            .await
    } else {
        let query =
            format!("SELECT {REQUEST_COLUMNS} FROM instructor_requests ORDER BY created_at DESC");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query(&query)
            .fetch_all(&pool.0)
            .instrument(span)
            .await
    }
    .map_err(ErrorKind::internal)?;

    let responses: Vec<InstructorRequestResponse> = rows.iter().map(row_to_response).collect();
    Ok(Json(responses).into_response())
}

/// Approve a request and promote the requester. Admin only.
#[utoipa::path(
    post,
    path = "/admin/roles/requests/{id}/approve",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request approved, requester promoted", body = DecisionResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Unknown request id")
    ),
    tag = "instructor-requests"
)]
pub async fn approve_request(
    Path(request_id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<Response, ErrorKind> {
    let admin = require_role(&headers, &pool, RoleRequirement::Admin).await?;
    decide(&pool, request_id, admin.user.user_id, true).await
}

/// Reject a request. Admin only; the requester keeps the student role.
#[utoipa::path(
    post,
    path = "/admin/roles/requests/{id}/reject",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request rejected", body = DecisionResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Unknown request id")
    ),
    tag = "instructor-requests"
)]
pub async fn reject_request(
    Path(request_id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<Response, ErrorKind> {
    let admin = require_role(&headers, &pool, RoleRequirement::Admin).await?;
    decide(&pool, request_id, admin.user.user_id, false).await
}

/// Record a decision; on approval, promote the requester in the same
/// transaction so the request and the role can never disagree.
async fn decide(
    pool: &PgPool,
    request_id: Uuid,
    admin_id: Uuid,
    approve: bool,
) -> Result<Response, ErrorKind> {
    let status = if approve { "approved" } else { "rejected" };

    let mut tx = pool.begin().await.map_err(ErrorKind::internal)?;

    let query = r"
        UPDATE instructor_requests
        SET status = $2, decided_by = $3, decided_at = NOW()
        WHERE id = $1
        RETURNING user_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(request_id)
        .bind(status)
        .bind(admin_id)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .map_err(ErrorKind::internal)?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Err(ErrorKind::NotFound);
    };

    let new_role = if approve {
        let user_id: Uuid = row.get("user_id");
        // Role transitions are limited to student -> instructor; approving a
        // request from an already-promoted account changes nothing.
        let query = "UPDATE users SET role = 'instructor' WHERE id = $1 AND role = 'student'";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .map_err(ErrorKind::internal)?;
        Some(Role::Instructor)
    } else {
        None
    };

    tx.commit().await.map_err(ErrorKind::internal)?;

    info!(%request_id, decision = status, "instructor request decided");
    Ok((
        StatusCode::OK,
        Json(DecisionResponse { ok: true, new_role }),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::super::auth::test_support::lazy_pool;
    use super::{approve_request, list_requests, submit_request};
    use anyhow::Result;
    use axum::extract::{Extension, Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use uuid::Uuid;

    use super::ListRequestsQuery;

    #[tokio::test]
    async fn submit_requires_authentication() -> Result<()> {
        let response = submit_request(HeaderMap::new(), Extension(lazy_pool()?), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn list_requires_authentication() -> Result<()> {
        let response = list_requests(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Query(ListRequestsQuery { status: None }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn approve_requires_authentication() -> Result<()> {
        let response = approve_request(
            Path(Uuid::nil()),
            HeaderMap::new(),
            Extension(lazy_pool()?),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
