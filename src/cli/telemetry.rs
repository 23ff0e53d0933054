//! Logging setup: env-filterable fmt subscriber, JSON output selectable via
//! `POLYLAB_LOG_JSON` for structured collection in production.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the CLI verbosity level applies
/// (default: errors only).
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init(level: Option<Level>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.unwrap_or(Level::ERROR);
        EnvFilter::new(level.to_string().to_lowercase())
    });

    let json = std::env::var("POLYLAB_LOG_JSON")
        .is_ok_and(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES"));

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|err| anyhow!("failed to initialize telemetry: {err}"))
}
