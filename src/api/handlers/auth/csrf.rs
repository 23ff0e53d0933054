//! CSRF double-submit protection.
//!
//! The guard is stateless: a random token is set in a cookie the frontend
//! can read, and every state-changing request must echo it in the
//! `X-CSRF-Token` header. Verification is an exact byte match between the
//! two; nothing is stored server-side.
//!
//! Bootstrap endpoints (token issuance, signup, login, verification, reset)
//! are exempt because a client cannot hold a valid token before
//! establishing trust. Those endpoints accept unauthenticated mutating
//! requests, so they sit behind the rate limiter and strict input
//! validation instead.

use axum::{
    Json,
    extract::{Extension, Request},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::error::ErrorKind;

use super::state::{AuthConfig, AuthState};
use super::types::CsrfResponse;
use super::utils::generate_token;

pub(crate) const CSRF_COOKIE_NAME: &str = "csrf_token";
pub(crate) const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Paths exempt from the double-submit check, matched by prefix.
/// `/auth/reset` also covers `/auth/reset/confirm`.
const EXEMPT_PREFIXES: &[&str] = &[
    "/auth/csrf",
    "/auth/signup",
    "/auth/login",
    "/auth/verify-email",
    "/auth/reset",
];

/// Build the CSRF cookie. Deliberately not `HttpOnly`: client script must be
/// able to read the value to echo it in the request header.
pub(crate) fn csrf_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let mut cookie = format!("{CSRF_COOKIE_NAME}={token}; Path=/; SameSite=Lax");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_csrf_cookie(
    config: &AuthConfig,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let mut cookie = format!("{CSRF_COOKIE_NAME}=; Path=/; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

/// Double-submit verification for one request.
///
/// Safe methods pass unconditionally; exempt bootstrap paths pass; anything
/// else requires the cookie and header to both be present and identical.
pub(crate) fn verify_double_submit(
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> Result<(), ErrorKind> {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(());
    }
    if EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        return Ok(());
    }

    let cookie = cookie_value(headers, CSRF_COOKIE_NAME);
    let header = headers
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match (cookie, header) {
        (Some(cookie), Some(header)) if !cookie.is_empty() && cookie == header => Ok(()),
        _ => Err(ErrorKind::CsrfMismatch),
    }
}

/// Middleware wrapper around [`verify_double_submit`].
pub async fn protect(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    if let Err(err) = verify_double_submit(&method, &path, request.headers()) {
        return err.into_response();
    }
    next.run(request).await
}

/// Issue a fresh CSRF token cookie and return the value in the body.
///
/// Every call generates a new token; clients fetch one per page bootstrap,
/// not per request.
#[utoipa::path(
    get,
    path = "/auth/csrf",
    responses(
        (status = 200, description = "CSRF cookie issued", body = CsrfResponse)
    ),
    tag = "auth"
)]
pub async fn issue_csrf(auth_state: Extension<Arc<AuthState>>) -> Result<Response, ErrorKind> {
    let token = generate_token().map_err(ErrorKind::internal)?;
    let cookie = csrf_cookie(auth_state.config(), &token).map_err(ErrorKind::internal)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((StatusCode::OK, headers, Json(CsrfResponse { csrf: token })).into_response())
}
