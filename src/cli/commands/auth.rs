use clap::{Arg, Command};

pub const ARG_FRONTEND_URL: &str = "frontend-url";
pub const ARG_SESSION_TTL_MINUTES: &str = "session-ttl-minutes";
pub const ARG_RATE_LIMIT_PER_MINUTE: &str = "rate-limit-per-minute";
pub const ARG_TOTP_ISSUER: &str = "totp-issuer";
pub const ARG_VERIFY_TOKEN_TTL_MINUTES: &str = "verify-token-ttl-minutes";
pub const ARG_RESET_TOKEN_TTL_MINUTES: &str = "reset-token-ttl-minutes";
pub const ARG_MFA_TOKEN_TTL_MINUTES: &str = "mfa-token-ttl-minutes";
pub const ARG_SWEEP_INTERVAL_SECONDS: &str = "sweep-interval-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend base URL; drives CORS, cookie security, and email links")
                .default_value("http://localhost:5173")
                .env("POLYLAB_FRONTEND_URL"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_MINUTES)
                .long(ARG_SESSION_TTL_MINUTES)
                .help("Session lifetime in minutes, fixed at creation (no sliding renewal)")
                .default_value("120")
                .env("POLYLAB_SESSION_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_PER_MINUTE)
                .long(ARG_RATE_LIMIT_PER_MINUTE)
                .help("Requests allowed per client per 60-second sliding window")
                .default_value("120")
                .env("POLYLAB_RATE_LIMIT_PER_MINUTE")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_TOTP_ISSUER)
                .long(ARG_TOTP_ISSUER)
                .help("Issuer name shown in authenticator apps")
                .default_value("PolyLab")
                .env("POLYLAB_TOTP_ISSUER"),
        )
        .arg(
            Arg::new(ARG_VERIFY_TOKEN_TTL_MINUTES)
                .long(ARG_VERIFY_TOKEN_TTL_MINUTES)
                .help("Email verification link lifetime in minutes")
                .default_value("60")
                .env("POLYLAB_VERIFY_TOKEN_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL_MINUTES)
                .long(ARG_RESET_TOKEN_TTL_MINUTES)
                .help("Password reset link lifetime in minutes")
                .default_value("30")
                .env("POLYLAB_RESET_TOKEN_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_MFA_TOKEN_TTL_MINUTES)
                .long(ARG_MFA_TOKEN_TTL_MINUTES)
                .help("MFA challenge token lifetime in minutes")
                .default_value("10")
                .env("POLYLAB_MFA_TOKEN_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SWEEP_INTERVAL_SECONDS)
                .long(ARG_SWEEP_INTERVAL_SECONDS)
                .help("Interval for the expired session/token sweeper")
                .default_value("300")
                .env("POLYLAB_SWEEP_INTERVAL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
