use super::handlers::{auth, health, instructor_requests, me};
use utoipa::openapi::{InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
/// Routes added outside (like `/` or `OPTIONS /health`) are intentionally
/// not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the
    // route to OpenAPI. Handlers in one `routes!` call share a path.
    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Signup, login, verification, and reset".to_string());

    let mut mfa_tag = Tag::new("mfa");
    mfa_tag.description = Some("TOTP enrollment and challenge verification".to_string());

    let mut requests_tag = Tag::new("instructor-requests");
    requests_tag.description = Some("Student promotion requests and admin review".to_string());

    let mut base_openapi = cargo_openapi();
    base_openapi.tags = Some(vec![auth_tag, mfa_tag, requests_tag]);

    let router = OpenApiRouter::with_openapi(base_openapi)
        .routes(routes!(health::health))
        .routes(routes!(auth::csrf::issue_csrf))
        .routes(routes!(auth::signup::signup))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::logout))
        .routes(routes!(
            auth::verification::verify_email,
            auth::verification::verify_email_page
        ))
        .routes(routes!(auth::reset::reset_start))
        .routes(routes!(auth::reset::reset_confirm))
        .routes(routes!(auth::mfa::enroll))
        .routes(routes!(auth::mfa::verify))
        .routes(routes!(me::get_me))
        .routes(routes!(instructor_requests::submit_request))
        .routes(routes!(instructor_requests::list_requests))
        .routes(routes!(instructor_requests::approve_request))
        .routes(routes!(instructor_requests::reject_request));

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        assert!(tags.iter().any(|tag| tag.name == "mfa"));

        for path in [
            "/auth/csrf",
            "/auth/signup",
            "/auth/login",
            "/auth/logout",
            "/auth/verify-email",
            "/auth/reset",
            "/auth/reset/confirm",
            "/auth/mfa/totp/enroll",
            "/auth/mfa/totp/verify",
            "/me",
            "/roles/requests",
            "/admin/roles/requests",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path: {path}");
        }
    }
}
