//! Security response headers applied to every response.
//!
//! Mirrors the hardening headers the frontend expects: clickjacking and
//! sniffing protection plus a content security policy that only allows API
//! calls back to the configured frontend origin.

use axum::{
    extract::{Extension, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::auth::state::AuthState;

pub async fn security_headers(
    Extension(auth_state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    if let Ok(value) = csp_value(auth_state.config().frontend_base_url()).parse() {
        headers.insert("content-security-policy", value);
    }
    response
}

fn csp_value(frontend_origin: &str) -> String {
    format!(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; \
         img-src 'self' data:; connect-src 'self' {frontend_origin}; frame-ancestors 'none';"
    )
}

#[cfg(test)]
mod tests {
    use super::csp_value;

    #[test]
    fn csp_includes_frontend_origin() {
        let csp = csp_value("http://localhost:5173");
        assert!(csp.contains("connect-src 'self' http://localhost:5173;"));
        assert!(csp.contains("frame-ancestors 'none';"));
    }
}
