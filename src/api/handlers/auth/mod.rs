//! Session and credential security core.
//!
//! Everything that has direct security consequences lives under this module:
//! password hashing policy, session issuance/resolution, single-use tokens,
//! CSRF double-submit, TOTP checks, role requirements, and the rate limiter.

pub mod csrf;
pub mod login;
pub mod mfa;
pub mod password;
pub mod principal;
pub mod rate_limit;
pub mod reset;
pub mod session;
pub mod signup;
pub mod state;
pub mod storage;
pub mod types;
pub(crate) mod utils;
pub mod verification;

pub use principal::{Role, RoleRequirement};
pub use rate_limit::{NoopRateLimiter, RateLimiter, SlidingWindowRateLimiter};
pub use state::{AuthConfig, AuthState};

#[cfg(test)]
pub(crate) mod test_support {
    use super::rate_limit::{NoopRateLimiter, RateLimiter};
    use super::state::{AuthConfig, AuthState};
    use crate::api::email::{LogNotifier, Notifier};
    use crate::totp::TotpEngine;
    use anyhow::Result;
    use sqlx::PgPool;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    /// A pool that never connects; handler tests only exercise paths that
    /// short-circuit before touching the database.
    pub(crate) fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    pub(crate) fn test_auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        let limiter: Arc<dyn RateLimiter> = Arc::new(NoopRateLimiter);
        Arc::new(AuthState::new(config, limiter))
    }

    pub(crate) fn log_notifier() -> Arc<dyn Notifier> {
        Arc::new(LogNotifier)
    }

    pub(crate) fn totp_engine() -> TotpEngine {
        TotpEngine::new("PolyLab".to_string())
    }
}
