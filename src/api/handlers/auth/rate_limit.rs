//! Sliding-window request rate limiting.
//!
//! Every inbound request passes through [`enforce`] before any handler
//! runs. Buckets are in-memory and per-process; restarts reset them, which
//! is acceptable for this tier of abuse protection.

use axum::{
    extract::{ConnectInfo, Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::api::error::ErrorKind;

use super::state::AuthState;
use super::utils::extract_client_ip;

const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

/// Admission check keyed by client identifier (normally the source IP).
pub trait RateLimiter: Send + Sync {
    fn check(&self, client_key: &str) -> RateLimitDecision;
}

/// Pass-through limiter for tests and handler-level unit checks.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _client_key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Time source, injectable so tests can advance the window deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Per-client sliding window over request timestamps.
///
/// Each check prunes entries older than the window, records the current
/// request, and rejects once the count exceeds the limit. Rejected requests
/// are recorded too, so a client cannot reset its window by hammering the
/// limiter with attempts it knows will fail.
pub struct SlidingWindowRateLimiter {
    window: Duration,
    limit: usize,
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowRateLimiter {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            window: DEFAULT_WINDOW,
            limit,
            clock: Arc::new(SystemClock),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn check(&self, client_key: &str) -> RateLimitDecision {
        let now = self.clock.now();
        // The map lock doubles as the per-key exclusion: prune+append+count
        // must not interleave for concurrent requests from one client.
        let mut buckets = self.buckets.lock().unwrap_or_else(|poisoned| {
            // A panic while holding the lock leaves only timestamps behind;
            // the data is still usable.
            poisoned.into_inner()
        });
        let bucket = buckets.entry(client_key.to_string()).or_default();

        while let Some(front) = bucket.front() {
            if now.duration_since(*front) > self.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        bucket.push_back(now);
        if bucket.len() > self.limit {
            RateLimitDecision::Limited
        } else {
            RateLimitDecision::Allowed
        }
    }
}

/// Middleware: admit or reject the request before any handler work.
pub async fn enforce(
    Extension(auth_state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    if auth_state.rate_limiter().check(&key) == RateLimitDecision::Limited {
        return ErrorKind::RateLimited.into_response();
    }
    next.run(request).await
}

/// Client identifier: proxy headers first, then the socket peer address.
fn client_key(request: &Request) -> String {
    if let Some(ip) = extract_client_ip(request.headers()) {
        return ip;
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().expect("clock lock");
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().expect("clock lock")
        }
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = SlidingWindowRateLimiter::new(3);
        for _ in 0..3 {
            assert_eq!(limiter.check("1.2.3.4"), RateLimitDecision::Allowed);
        }
        assert_eq!(limiter.check("1.2.3.4"), RateLimitDecision::Limited);
    }

    #[test]
    fn window_expiry_readmits() {
        let clock = Arc::new(ManualClock::new());
        let limiter = SlidingWindowRateLimiter::new(2).with_clock(clock.clone());

        assert_eq!(limiter.check("client"), RateLimitDecision::Allowed);
        assert_eq!(limiter.check("client"), RateLimitDecision::Allowed);
        assert_eq!(limiter.check("client"), RateLimitDecision::Limited);

        clock.advance(Duration::from_secs(61));
        assert_eq!(limiter.check("client"), RateLimitDecision::Allowed);
    }

    #[test]
    fn rejected_attempts_are_recorded() {
        let clock = Arc::new(ManualClock::new());
        let limiter = SlidingWindowRateLimiter::new(1).with_clock(clock.clone());

        assert_eq!(limiter.check("client"), RateLimitDecision::Allowed);
        assert_eq!(limiter.check("client"), RateLimitDecision::Limited);

        // The rejected attempt above still counts, so half a window later
        // the client is still over the limit.
        clock.advance(Duration::from_secs(30));
        assert_eq!(limiter.check("client"), RateLimitDecision::Limited);

        // Only once all recorded attempts age out does admission resume.
        clock.advance(Duration::from_secs(61));
        assert_eq!(limiter.check("client"), RateLimitDecision::Allowed);
    }

    #[test]
    fn buckets_are_per_client() {
        let limiter = SlidingWindowRateLimiter::new(1);
        assert_eq!(limiter.check("a"), RateLimitDecision::Allowed);
        assert_eq!(limiter.check("a"), RateLimitDecision::Limited);
        assert_eq!(limiter.check("b"), RateLimitDecision::Allowed);
    }

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(limiter.check("1.2.3.4"), RateLimitDecision::Allowed);
    }
}
