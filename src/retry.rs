//! Retry logic with linear backoff
//!
//! Carrier calls are retried a fixed number of times. After failed attempt
//! `n` the caller sleeps `n * base_delay`; the final attempt is never followed
//! by a sleep. With the defaults (4 attempts, 3 s) an always-failing call
//! sleeps 3 + 6 + 9 seconds in total.
//!
//! # Example
//!
//! ```no_run
//! use pod_tracker::retry::{IsRetryable, with_linear_backoff};
//! use pod_tracker::config::RetryConfig;
//!
//! #[derive(Debug)]
//! struct Flaky;
//!
//! impl std::fmt::Display for Flaky {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "flaky")
//!     }
//! }
//!
//! impl IsRetryable for Flaky {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn example() -> Result<(), Flaky> {
//! let config = RetryConfig::default();
//! let value = with_linear_backoff(
//!     &config,
//!     || async { Ok::<_, Flaky>(42) },
//!     |attempt, error: &Flaky| eprintln!("attempt {} failed: {}", attempt, error),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transport, HTTP status and parsing failures should return `true`.
/// Configuration and credential failures should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Connect failures, timeouts and body read errors
            Error::Network(_) => true,
            // Carrier answered with an error status
            Error::Api { .. } => true,
            // Truncated or malformed response body
            Error::Serialization(_) => true,
            // Writing the POD or reading a response can fail transiently
            Error::Io(_) => true,
            // A corrupt payload will not decode differently next time
            Error::Decode(_) => false,
            Error::Config { .. } => false,
            Error::Auth(_) => false,
            Error::Merge(_) => false,
            Error::ExternalTool(_) => false,
            Error::NotSupported(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Sleep after the given failed attempt (1-based)
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    config.base_delay * attempt
}

/// Execute an async operation with linear backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, base delay)
/// * `operation` - Async closure that returns `Result<T, E>` where `E` implements [`IsRetryable`]
/// * `on_failure` - Called with the 1-based attempt number after every failed attempt,
///   before any sleep
///
/// # Returns
///
/// Returns the successful result, the first non-retryable error, or the last
/// error once `max_attempts` attempts have been made.
pub async fn with_linear_backoff<F, Fut, T, E, N>(
    config: &RetryConfig,
    mut operation: F,
    mut on_failure: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
    N: FnMut(u32, &E),
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                on_failure(attempt, &e);

                if !e.is_retryable() {
                    tracing::error!(error = %e, "operation failed with non-retryable error");
                    return Err(e);
                }
                if attempt >= max_attempts {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "operation failed after all retry attempts exhausted"
                    );
                    return Err(e);
                }

                let delay = backoff_delay(config, attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
