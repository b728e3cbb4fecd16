//! Capped-backoff connection establishment.
//!
//! A connection is attempted once, then retried per [`ReconnectPolicy`]
//! until it succeeds or the retry budget is spent. The outcome is written
//! to the connection's [`ConnectionState`]: `Ready` on success, `Failed`
//! once the policy gives up.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::readiness::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// base * 2^(retry - 1)
    #[default]
    Exponential,
    /// base * retry
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries after the first attempt before giving up.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Cap applied to every computed delay.
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(3000),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl ReconnectPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `retry` (1-indexed).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let delay = match self.strategy {
            BackoffStrategy::Exponential => {
                let factor = 2u32.checked_pow(retry - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
            BackoffStrategy::Linear => self.base_delay.saturating_mul(retry),
        };

        delay.min(self.max_delay)
    }

    pub fn should_retry(&self, retry: u32) -> bool {
        retry <= self.max_retries
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("{connection}: gave up after {attempts} attempts: {last_error}")]
    GaveUp {
        connection: &'static str,
        attempts: u32,
        last_error: String,
    },
}

/// Run `connect` until it succeeds or `policy` gives up, updating `state`.
pub async fn establish<T, E, F, Fut>(
    state: &ConnectionState,
    policy: &ReconnectPolicy,
    mut connect: F,
) -> Result<T, ConnectError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retry = 0u32;
    loop {
        match connect().await {
            Ok(value) => {
                state.mark_ready();
                info!(connection = state.name(), attempts = retry + 1, "connection established");
                return Ok(value);
            }
            Err(e) => {
                retry += 1;
                if !policy.should_retry(retry) {
                    state.mark_failed();
                    error!(connection = state.name(), attempts = retry, error = %e, "too many retries; giving up");
                    return Err(ConnectError::GaveUp {
                        connection: state.name(),
                        attempts: retry,
                        last_error: e.to_string(),
                    });
                }

                let delay = policy.delay_for_attempt(retry);
                warn!(
                    connection = state.name(),
                    attempt = retry,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "reconnecting"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
