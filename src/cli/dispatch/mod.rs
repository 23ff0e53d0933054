use crate::cli::{
    actions::{Action, server},
    commands::{auth, email},
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;

/// Turn parsed CLI matches into an executable action.
///
/// # Errors
/// Returns an error when required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let notifier = matches
        .get_one::<String>(email::ARG_NOTIFIER)
        .map(String::as_str)
        .and_then(server::NotifierKind::from_str)
        .context("invalid notifier")?;

    let args = server::Args {
        port: matches
            .get_one::<u16>("port")
            .copied()
            .context("missing port")?,
        dsn: matches
            .get_one::<String>("dsn")
            .cloned()
            .context("missing dsn")?,
        frontend_base_url: matches
            .get_one::<String>(auth::ARG_FRONTEND_URL)
            .cloned()
            .context("missing frontend url")?,
        session_ttl_minutes: matches
            .get_one::<i64>(auth::ARG_SESSION_TTL_MINUTES)
            .copied()
            .context("missing session ttl")?,
        rate_limit_per_minute: matches
            .get_one::<usize>(auth::ARG_RATE_LIMIT_PER_MINUTE)
            .copied()
            .context("missing rate limit")?,
        totp_issuer: matches
            .get_one::<String>(auth::ARG_TOTP_ISSUER)
            .cloned()
            .context("missing totp issuer")?,
        verify_token_ttl_minutes: matches
            .get_one::<i64>(auth::ARG_VERIFY_TOKEN_TTL_MINUTES)
            .copied()
            .context("missing verify token ttl")?,
        reset_token_ttl_minutes: matches
            .get_one::<i64>(auth::ARG_RESET_TOKEN_TTL_MINUTES)
            .copied()
            .context("missing reset token ttl")?,
        mfa_token_ttl_minutes: matches
            .get_one::<i64>(auth::ARG_MFA_TOKEN_TTL_MINUTES)
            .copied()
            .context("missing mfa token ttl")?,
        sweep_interval_seconds: matches
            .get_one::<u64>(auth::ARG_SWEEP_INTERVAL_SECONDS)
            .copied()
            .context("missing sweep interval")?,
        notifier,
        smtp_host: matches.get_one::<String>(email::ARG_SMTP_HOST).cloned(),
        smtp_port: matches
            .get_one::<u16>(email::ARG_SMTP_PORT)
            .copied()
            .context("missing smtp port")?,
        smtp_username: matches.get_one::<String>(email::ARG_SMTP_USERNAME).cloned(),
        smtp_password: matches
            .get_one::<String>(email::ARG_SMTP_PASSWORD)
            .cloned()
            .map(SecretString::from),
        smtp_from: matches.get_one::<String>(email::ARG_SMTP_FROM).cloned(),
    };

    Ok(Action::Server(Box::new(args)))
}
