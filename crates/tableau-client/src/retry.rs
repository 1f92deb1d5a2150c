//! Retry utilities with exponential backoff.
//!
//! Rate-limit and transient failures from the REST API are retried with a
//! bounded, exponentially growing delay. Errors the caller marks as not
//! retryable are returned on the first attempt.
//!
//! # Example
//!
//! ```rust,no_run
//! use tableau_client::retry::{with_retry_if, RetryConfig};
//! use std::time::Duration;
//!
//! async fn example() -> Result<String, std::io::Error> {
//!     let config = RetryConfig {
//!         max_attempts: 4,
//!         initial_delay: Duration::from_millis(250),
//!         max_delay: Duration::from_secs(8),
//!         exponential_base: 2.0,
//!     };
//!
//!     with_retry_if(
//!         &config,
//!         || async { Ok("page".to_string()) },
//!         |err: &std::io::Error| err.kind() == std::io::ErrorKind::TimedOut,
//!     )
//!     .await
//! }
//! ```

use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth factor between consecutive delays (typically 2.0)
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Configuration allowing `max_retries` retries after the first attempt.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            ..Self::default()
        }
    }

    /// Create a configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            exponential_base: 1.0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// # Example
    ///
    /// ```
    /// use tableau_client::retry::RetryConfig;
    /// use std::time::Duration;
    ///
    /// let config = RetryConfig::default();
    /// assert_eq!(config.delay_after(1), Duration::from_millis(500));
    /// assert_eq!(config.delay_after(2), Duration::from_millis(1000));
    /// assert_eq!(config.delay_after(20), Duration::from_secs(30));
    /// ```
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.exponential_base.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Execute a function with retries, retrying only errors accepted by
/// `is_retryable`.
///
/// # Returns
///
/// The first success, the first non-retryable error, or the last error once
/// `max_attempts` is reached.
pub async fn with_retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    mut f: F,
    mut is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
    P: FnMut(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if !is_retryable(&e) => {
                tracing::debug!(error = ?e, "Error is not retryable, returning immediately");
                return Err(e);
            }
            Err(e) if attempt >= config.max_attempts => {
                tracing::error!(attempts = attempt, error = ?e, "All retry attempts exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = config.delay_after(attempt);
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = ?e,
                    "Request failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}
