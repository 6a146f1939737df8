//! Bounded retry with exponential backoff and jitter
//!
//! Shared by transaction submission and off-chain uploads. Transient errors
//! back off and retry; permanent errors return immediately.

use crate::structured_logging::OperationLogger;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy for network operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including initial attempt)
    pub max_attempts: u32,

    /// Base delay in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Jitter factor (0.0 - 1.0)
    pub jitter_factor: f64,

    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter_factor: 0.2,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy for off-chain uploads: slower, longer cap
    pub fn upload() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 16_000,
            jitter_factor: 0.2,
            multiplier: 2.0,
        }
    }

    /// Policy with no waiting, for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
            multiplier: 1.0,
        }
    }

    /// Delay before the attempt following `attempt` (0-indexed), `None` once the budget is spent
    pub fn calculate_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }

        let delay_ms = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let jitter_range = delay_ms * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        Some(Duration::from_millis((delay_ms + jitter).max(0.0) as u64))
    }
}

/// Error that knows whether another attempt may succeed
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for crate::rpc::RpcError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

/// Terminal failure of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure<E> {
    pub attempts: u32,
    pub error: E,
    /// `true` when transient errors used up the budget, `false` on a permanent error
    pub exhausted: bool,
}

/// Run `operation` until it succeeds, fails permanently, or the budget runs out
///
/// The closure receives the 0-indexed attempt number.
pub async fn retry_with_backoff<F, Fut, T, E>(
    logger: &OperationLogger,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<(T, u32), RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        logger.log_attempt(attempt + 1, max_attempts);

        match operation(attempt).await {
            Ok(value) => return Ok((value, attempt + 1)),
            Err(err) if !err.is_transient() => {
                logger.warn(&format!("Permanent error, not retrying: {}", err));
                return Err(RetryFailure {
                    attempts: attempt + 1,
                    error: err,
                    exhausted: false,
                });
            }
            Err(err) => match policy.calculate_delay(attempt).filter(|_| attempt + 1 < max_attempts) {
                Some(backoff) => {
                    logger.log_retry(attempt + 1, backoff.as_millis() as u64, &err.to_string());
                    sleep(backoff).await;
                    attempt += 1;
                }
                None => {
                    logger.warn(&format!(
                        "All {} attempts exhausted: {}",
                        attempt + 1,
                        err
                    ));
                    return Err(RetryFailure {
                        attempts: attempt + 1,
                        error: err,
                        exhausted: true,
                    });
                }
            },
        }
    }
}
