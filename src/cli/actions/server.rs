use crate::api::{
    self,
    email::{LogNotifier, Notifier, SmtpConfig, SmtpNotifier},
    handlers::auth::{AuthConfig, AuthState, RateLimiter, SlidingWindowRateLimiter},
    sweep::SweepConfig,
};
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;

/// Notification sink selection. Explicit configuration, never inferred from
/// which credentials happen to be present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifierKind {
    Log,
    Smtp,
}

impl NotifierKind {
    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "log" => Some(Self::Log),
            "smtp" => Some(Self::Smtp),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub session_ttl_minutes: i64,
    pub rate_limit_per_minute: usize,
    pub totp_issuer: String,
    pub verify_token_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    pub mfa_token_ttl_minutes: i64,
    pub sweep_interval_seconds: u64,
    pub notifier: NotifierKind,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub smtp_from: Option<String>,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if configuration is inconsistent or the server fails to
/// start.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server(args) = action;
    execute(*args).await
}

async fn execute(args: Args) -> Result<()> {
    let config = AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_minutes * 60)
        .with_verify_token_ttl_seconds(args.verify_token_ttl_minutes * 60)
        .with_reset_token_ttl_seconds(args.reset_token_ttl_minutes * 60)
        .with_mfa_token_ttl_seconds(args.mfa_token_ttl_minutes * 60)
        .with_totp_issuer(args.totp_issuer);

    let limiter: Arc<dyn RateLimiter> =
        Arc::new(SlidingWindowRateLimiter::new(args.rate_limit_per_minute));
    let auth_state = Arc::new(AuthState::new(config, limiter));

    let notifier: Arc<dyn Notifier> = match args.notifier {
        NotifierKind::Log => Arc::new(LogNotifier),
        NotifierKind::Smtp => {
            let host = args
                .smtp_host
                .context("--smtp-host is required for the smtp notifier")?;
            let from = args
                .smtp_from
                .context("--smtp-from is required for the smtp notifier")?;
            let mut smtp = SmtpConfig::new(host, from).with_port(args.smtp_port);
            if let Some(username) = args.smtp_username {
                let password = args
                    .smtp_password
                    .unwrap_or_else(|| SecretString::from(String::new()));
                smtp = smtp.with_credentials(username, password);
            }
            Arc::new(SmtpNotifier::new(smtp))
        }
    };

    let sweep_config = SweepConfig::new().with_interval_seconds(args.sweep_interval_seconds);

    api::new(args.port, args.dsn, auth_state, notifier, sweep_config).await
}

#[cfg(test)]
mod tests {
    use super::NotifierKind;

    #[test]
    fn notifier_kind_parses() {
        assert_eq!(NotifierKind::from_str("log"), Some(NotifierKind::Log));
        assert_eq!(NotifierKind::from_str("smtp"), Some(NotifierKind::Smtp));
        assert_eq!(NotifierKind::from_str("pigeon"), None);
    }
}
