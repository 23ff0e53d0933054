//! # PolyLab Auth (Accounts, Sessions & Roles)
//!
//! `polylab-auth` is the authentication and authorization service for the
//! PolyLab learning platform. It owns account signup, email verification,
//! password reset, TOTP multi-factor authentication, cookie sessions,
//! role-based access control, CSRF double-submit protection, and a per-client
//! sliding-window rate limiter.
//!
//! ## Security model
//!
//! - Passwords are hashed with Argon2id (fresh random salt per hash); the
//!   database never sees a raw password.
//! - Session identifiers and single-use tokens (verify/reset/MFA) are
//!   256-bit random values; only their SHA-256 digests are stored, so a
//!   database leak does not expose live credentials.
//! - Single-use tokens are purpose-scoped and consumed with a single
//!   conditional delete, so a token can never be redeemed twice even under
//!   concurrent requests.
//! - State-changing requests require a CSRF double-submit match, except for
//!   the bootstrap endpoints a client must reach before it can hold a token
//!   (signup, login, verification, reset). Those endpoints are rate limited
//!   and strictly validated instead.
//!
//! ## Roles
//!
//! Accounts carry one of three roles: `student`, `instructor`, `admin`.
//! Students may request instructor status; an admin approving the request is
//! the only regular transition. `admin` satisfies instructor-level
//! requirements, but admin-only endpoints reject everyone else.

pub mod api;
pub mod cli;
pub mod totp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
