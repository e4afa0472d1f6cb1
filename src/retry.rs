//! Retry logic with exponential backoff
//!
//! The Service Layer sheds load with 429 and 5xx gateway statuses. Those are
//! retried with exponential backoff; every other failure is returned on the
//! first attempt.
//!
//! # Example
//!
//! ```no_run
//! use sl_export::retry::{IsRetryable, with_retry};
//! use sl_export::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Busy,
//!     Rejected,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Busy)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, || async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Status codes the Service Layer uses for temporary conditions
pub const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Returns true for statuses worth retrying
pub fn is_transient_status(status: u16) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Http { status, .. } => is_transient_status(*status),
            // Connect/timeout failures surface immediately, only server-declared
            // busy states are retried
            Error::Network(_) => false,
            Error::Login { .. } => false,
            Error::Config { .. } => false,
            Error::InvalidUrl(_) => false,
            Error::Serialization(_) => false,
            Error::Csv(_) | Error::Io(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Execute an async operation, retrying transient failures with exponential backoff
///
/// `config.max_attempts` counts every call, including the first. The delay
/// starts at `config.initial_delay` and is multiplied by
/// `config.backoff_multiplier` after each retry, capped at `config.max_delay`.
/// No delay follows the final attempt.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = wait.as_millis(),
                    "transient failure, retrying"
                );

                tokio::time::sleep(wait).await;

                attempt += 1;
                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(error = %e, attempts = attempt, "retry budget exhausted");
                } else {
                    tracing::debug!(error = %e, "non-retryable failure");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter between 0% and 100% of `delay`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
