//! Session cookie handling and the logout endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::csrf::clear_csrf_cookie;
use super::state::{AuthConfig, AuthState};
use super::types::OkResponse;
use super::utils::hash_token;

pub(crate) const SESSION_COOKIE_NAME: &str = "session_id";

/// Build the `HttpOnly` session cookie. Max-Age matches the session TTL so
/// the browser drops the cookie when the server would reject it anyway.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(
    config: &AuthConfig,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the raw session token out of the request's `Cookie` header.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session revoked and cookies cleared", body = OkResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        let token_hash = hash_token(&token);
        // Revocation is idempotent; a stale cookie is not an error.
        if let Err(err) = super::storage::delete_session(&pool, &token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear both cookies, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    let config = auth_state.config();
    if let Ok(cookie) = clear_session_cookie(config) {
        response_headers.append(SET_COOKIE, cookie);
    }
    if let Ok(cookie) = clear_csrf_cookie(config) {
        response_headers.append(SET_COOKIE, cookie);
    }
    (StatusCode::OK, response_headers, Json(OkResponse { ok: true })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    fn config(frontend: &str) -> AuthConfig {
        AuthConfig::new(frontend.to_string())
    }

    #[test]
    fn session_cookie_is_http_only_lax() {
        let cookie = session_cookie(&config("http://localhost:5173"), "tok").expect("cookie");
        let value = cookie.to_str().expect("ascii");
        assert!(value.starts_with("session_id=tok; Path=/; HttpOnly; SameSite=Lax"));
        assert!(value.contains("Max-Age=7200"));
        assert!(!value.contains("Secure"));
    }

    #[test]
    fn session_cookie_secure_with_https_frontend() {
        let cookie = session_cookie(&config("https://polylab.dev"), "tok").expect("cookie");
        assert!(cookie.to_str().expect("ascii").ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_zeroes_max_age() {
        let cookie = clear_session_cookie(&config("http://localhost:5173")).expect("cookie");
        assert!(cookie.to_str().expect("ascii").contains("Max-Age=0"));
    }

    #[test]
    fn extract_session_token_finds_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("csrf_token=abc; session_id=xyz; other=1"),
        );
        assert_eq!(extract_session_token(&headers), Some("xyz".to_string()));
    }

    #[test]
    fn extract_session_token_none_without_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("csrf_token=abc"));
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }
}
