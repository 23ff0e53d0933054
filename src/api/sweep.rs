//! Background expiry sweeper.
//!
//! Deletes expired sessions and single-use tokens on a fixed cadence. This
//! is storage hygiene only: every read and consume path re-checks expiry in
//! SQL, so correctness never depends on the sweeper having run.

use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

use super::handlers::auth::storage::purge_expired;

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone, Copy, Debug)]
pub struct SweepConfig {
    interval: Duration,
}

impl SweepConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval_seconds(mut self, seconds: u64) -> Self {
        self.interval = Duration::from_secs(seconds.max(1));
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the sweeper task. Failures are logged and the loop continues.
pub fn spawn_expiry_sweeper(pool: PgPool, config: SweepConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match purge_expired(&pool).await {
                Ok((sessions, tokens)) => {
                    if sessions > 0 || tokens > 0 {
                        debug!(sessions, tokens, "purged expired rows");
                    }
                }
                Err(err) => error!("expiry sweep failed: {err}"),
            }
            sleep(config.interval()).await;
        }
    })
}
