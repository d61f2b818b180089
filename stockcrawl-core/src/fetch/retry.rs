//! Retry policy and retry-event reporting.

use super::transport::TransportError;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Sleep between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

/// Callbacks for the interesting moments of a fetch.
///
/// `attempt` is 1-based. The Fetcher keeps no state between calls, so anything
/// that wants to count retries across calls does it here.
pub trait FetchObserver {
    /// An attempt failed and another one will follow after the delay.
    fn on_retry(&self, url: &str, attempt: u32, error: &TransportError);

    /// The payload arrived. `attempts > 1` means it was recovered by retrying.
    fn on_success(&self, url: &str, attempts: u32);

    /// The call ended without a payload.
    fn on_give_up(&self, url: &str, attempts: u32, error: &TransportError);
}

/// Default observer: structured log lines.
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_retry(&self, url: &str, attempt: u32, error: &TransportError) {
        warn!(url, attempt, %error, "connection failed, retrying");
    }

    fn on_success(&self, url: &str, attempts: u32) {
        if attempts > 1 {
            info!(url, attempts, "connection retry success");
        } else {
            debug!(url, "fetched");
        }
    }

    fn on_give_up(&self, url: &str, attempts: u32, error: &TransportError) {
        warn!(url, attempts, %error, "giving up");
    }
}
