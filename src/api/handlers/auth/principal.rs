//! Authenticated principal extraction and role checks.
//!
//! Flow Overview: read the session cookie, resolve it to a user, and return a
//! principal that downstream handlers can use. Role requirements are checked
//! against a closed enum rather than strings so a typo cannot silently grant
//! or deny access.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::api::error::ErrorKind;

use super::session::extract_session_token;
use super::storage::{UserRecord, lookup_session};
use super::utils::hash_token;

/// Account role. Transitions are limited to student → instructor via an
/// approved instructor request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    pub(crate) fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "student" => Some(Self::Student),
            "instructor" => Some(Self::Instructor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Role requirement for an endpoint. The hierarchy is deliberately not a
/// linear order: admin satisfies instructor-level requirements, but
/// admin-only requirements reject instructors, and the student requirement
/// is exact (an instructor has nothing to request).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoleRequirement {
    Student,
    InstructorOrAdmin,
    Admin,
}

impl RoleRequirement {
    #[must_use]
    pub fn satisfied_by(self, role: Role) -> bool {
        match self {
            Self::Student => role == Role::Student,
            Self::InstructorOrAdmin => matches!(role, Role::Instructor | Role::Admin),
            Self::Admin => role == Role::Admin,
        }
    }
}

/// Authenticated user context derived from the session cookie.
#[derive(Debug)]
pub struct Principal {
    pub(crate) user: UserRecord,
}

/// Resolve the session cookie into a principal.
///
/// Distinguishes the three failure modes deliberately: no/unknown cookie
/// (`Unauthenticated`), a session past its expiry (`SessionExpired`, the row
/// is left for the sweeper), and a session whose owning user has been
/// deleted (`UserNotFound`).
///
/// # Errors
/// Returns the applicable [`ErrorKind`] auth failure, or `Internal` on
/// storage errors.
pub(crate) async fn require_user(
    headers: &HeaderMap,
    pool: &PgPool,
) -> Result<Principal, ErrorKind> {
    let Some(token) = extract_session_token(headers) else {
        return Err(ErrorKind::Unauthenticated);
    };
    let token_hash = hash_token(&token);
    let Some(lookup) = lookup_session(pool, &token_hash)
        .await
        .map_err(ErrorKind::internal)?
    else {
        return Err(ErrorKind::Unauthenticated);
    };
    if lookup.expired {
        return Err(ErrorKind::SessionExpired);
    }
    let Some(user) = lookup.user else {
        return Err(ErrorKind::UserNotFound);
    };
    Ok(Principal { user })
}

/// Resolve the session and additionally check a role requirement.
///
/// # Errors
/// Returns `Forbidden` when authenticated but the role does not satisfy the
/// requirement, otherwise the same failures as [`require_user`].
pub(crate) async fn require_role(
    headers: &HeaderMap,
    pool: &PgPool,
    requirement: RoleRequirement,
) -> Result<Principal, ErrorKind> {
    let principal = require_user(headers, pool).await?;
    if !requirement.satisfied_by(principal.user.role) {
        return Err(ErrorKind::Forbidden);
    }
    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips() {
        for role in [Role::Student, Role::Instructor, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("superuser"), None);
    }

    #[test]
    fn admin_satisfies_instructor_requirement() {
        assert!(RoleRequirement::InstructorOrAdmin.satisfied_by(Role::Admin));
        assert!(RoleRequirement::InstructorOrAdmin.satisfied_by(Role::Instructor));
        assert!(!RoleRequirement::InstructorOrAdmin.satisfied_by(Role::Student));
    }

    #[test]
    fn admin_requirement_rejects_instructors() {
        assert!(RoleRequirement::Admin.satisfied_by(Role::Admin));
        assert!(!RoleRequirement::Admin.satisfied_by(Role::Instructor));
        assert!(!RoleRequirement::Admin.satisfied_by(Role::Student));
    }

    #[test]
    fn student_requirement_is_exact() {
        assert!(RoleRequirement::Student.satisfied_by(Role::Student));
        assert!(!RoleRequirement::Student.satisfied_by(Role::Instructor));
        assert!(!RoleRequirement::Student.satisfied_by(Role::Admin));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Instructor).expect("serialize");
        assert_eq!(json, "\"instructor\"");
    }
}
