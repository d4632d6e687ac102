//! Fixed-interval retry and polling.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{VendError, VendResult};

/// Default wait between attempts.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Outcome of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Ready(T),
    /// Still waiting; carries the observed status for logging.
    Pending(String),
}

/// Fixed-delay retry policy with an optional attempt bound.
///
/// `max_attempts: None` keeps trying until the provider answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub interval_secs: u64,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            max_attempts: None,
        }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            max_attempts: Some(max_attempts),
        }
    }

    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(false, |max| attempt >= max)
    }

    /// Call `f` until it succeeds, sleeping between failed attempts.
    ///
    /// Only raw provider errors are retried; anything else is returned
    /// immediately.
    pub async fn retry<T, F, Fut>(&self, operation: &str, mut f: F) -> VendResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = VendResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    if self.exhausted(attempt) {
                        return Err(VendError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            last_error: err.to_string(),
                        });
                    }
                    warn!("{} attempt {} failed: {}", operation, attempt, err);
                    warn!("Retrying in {}s...", self.interval_secs);
                    tokio::time::sleep(self.interval()).await;
                }
            }
        }
    }

    /// Check status with `f` until it reports a terminal value.
    ///
    /// Errors from `f` abort the poll.
    pub async fn poll<T, F, Fut>(&self, operation: &str, mut f: F) -> VendResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = VendResult<PollStatus<T>>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f(attempt).await? {
                PollStatus::Ready(value) => return Ok(value),
                PollStatus::Pending(status) => {
                    if self.exhausted(attempt) {
                        return Err(VendError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            last_error: format!("still {}", status),
                        });
                    }
                    debug!("{} poll {}: {}", operation, attempt, status);
                    tokio::time::sleep(self.interval()).await;
                }
            }
        }
    }
}
