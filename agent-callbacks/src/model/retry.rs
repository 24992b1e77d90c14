//! Bounded retry for remote calls.
//!
//! Exponential backoff with +/-25% jitter and a fixed attempt cap. Only errors the
//! caller classifies as retryable are attempted again; everything else surfaces at once.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Returns `true` if the HTTP status code is transient and worth retrying.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay_ms,
            ..Default::default()
        }
    }

    /// Delay before the retry that follows `attempt` (0-based).
    ///
    /// - attempt 0: ~base (0.75x - 1.25x)
    /// - attempt 1: ~2x base
    /// - attempt 2: ~4x base
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let jitter_range = base_ms / 4;
        let jitter = if jitter_range > 0 {
            let offset = rand::thread_rng().gen_range(0..=jitter_range * 2);
            offset as i64 - jitter_range as i64
        } else {
            0
        };
        let delay_ms = (base_ms as i64).saturating_add(jitter).max(0) as u64;
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the policy's
/// attempt cap is reached. The last error is returned unchanged.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: fn(&E) -> bool,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => {
                if attempt > 0 {
                    log::info!("[RETRY] {} succeeded after {} retries", operation, attempt);
                }
                return Ok(value);
            }
            Err(e) if is_retryable(&e) && attempt + 1 < max_attempts => {
                let delay = policy.backoff_delay(attempt);
                log::warn!(
                    "[RETRY] {} failed (attempt {}/{}): {}. Retrying in {:?}",
                    operation,
                    attempt + 1,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
