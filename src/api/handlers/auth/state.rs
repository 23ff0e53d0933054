//! Auth configuration and shared request state.

use std::sync::Arc;

use super::rate_limit::RateLimiter;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 120 * 60;
const DEFAULT_VERIFY_TOKEN_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_MFA_TOKEN_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_TOTP_ISSUER: &str = "PolyLab";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    verify_token_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    mfa_token_ttl_seconds: i64,
    totp_issuer: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            verify_token_ttl_seconds: DEFAULT_VERIFY_TOKEN_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            mfa_token_ttl_seconds: DEFAULT_MFA_TOKEN_TTL_SECONDS,
            totp_issuer: DEFAULT_TOTP_ISSUER.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_verify_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verify_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_mfa_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.mfa_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_totp_issuer(mut self, issuer: String) -> Self {
        self.totp_issuer = issuer;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn verify_token_ttl_seconds(&self) -> i64 {
        self.verify_token_ttl_seconds
    }

    pub(crate) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    pub(crate) fn mfa_token_ttl_seconds(&self) -> i64 {
        self.mfa_token_ttl_seconds
    }

    #[must_use]
    pub fn totp_issuer(&self) -> &str {
        &self.totp_issuer
    }

    /// Cookies carry the `Secure` flag whenever the frontend is served over
    /// HTTPS; plain HTTP is assumed to be local development.
    pub(crate) fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            config,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::{NoopRateLimiter, RateLimiter};
    use super::{AuthConfig, AuthState};
    use std::sync::Arc;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://polylab.dev".to_string());

        assert_eq!(config.frontend_base_url(), "https://polylab.dev");
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert_eq!(
            config.verify_token_ttl_seconds(),
            super::DEFAULT_VERIFY_TOKEN_TTL_SECONDS
        );
        assert_eq!(config.totp_issuer(), super::DEFAULT_TOTP_ISSUER);

        let config = config
            .with_session_ttl_seconds(60)
            .with_verify_token_ttl_seconds(120)
            .with_reset_token_ttl_seconds(180)
            .with_mfa_token_ttl_seconds(240)
            .with_totp_issuer("Test".to_string());

        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.verify_token_ttl_seconds(), 120);
        assert_eq!(config.reset_token_ttl_seconds(), 180);
        assert_eq!(config.mfa_token_ttl_seconds(), 240);
        assert_eq!(config.totp_issuer(), "Test");
    }

    #[test]
    fn cookie_secure_tracks_frontend_scheme() {
        assert!(AuthConfig::new("https://polylab.dev".to_string()).cookie_secure());
        assert!(!AuthConfig::new("http://localhost:5173".to_string()).cookie_secure());
    }

    #[test]
    fn auth_state_exposes_parts() {
        let config = AuthConfig::new("https://polylab.dev".to_string());
        let limiter: Arc<dyn RateLimiter> = Arc::new(NoopRateLimiter);
        let state = AuthState::new(config, limiter);
        assert!(state.config().cookie_secure());
    }
}
