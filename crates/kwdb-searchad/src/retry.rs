//! Retry with exponential back-off and jitter for the API clients.
//!
//! [`retry_with_backoff`] wraps one fallible call and retries on transient
//! errors (network failures, timeouts, 5xx). Quota and client errors are
//! returned immediately: a 429 deactivates the credential and must never be
//! retried on it.

use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &kwdb_core::AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.retry_backoff_base_ms,
            max_delay_ms: config.retry_backoff_max_ms,
        }
    }

    /// A policy that never sleeps; for tests.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Un-jittered delay before retry number `attempt` (1-based):
    /// `base * 2^(attempt - 1)`, capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(20);
        self.base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms)
    }
}

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, 5xx responses.
///
/// **Not retriable:** [`ApiError::QuotaExceeded`], [`ApiError::ClientError`],
/// [`ApiError::Malformed`], [`ApiError::Deserialize`],
/// [`ApiError::NoCredentials`], [`ApiError::InvalidSecret`],
/// [`ApiError::InvalidBaseUrl`].
pub(crate) fn is_retriable(err: &ApiError) -> bool {
    match err {
        ApiError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ApiError::ServerError { .. } => true,
        ApiError::QuotaExceeded { .. }
        | ApiError::ClientError { .. }
        | ApiError::Malformed { .. }
        | ApiError::Deserialize { .. }
        | ApiError::NoCredentials { .. }
        | ApiError::InvalidSecret { .. }
        | ApiError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation`, retrying transient failures up to `policy.max_retries`
/// additional times. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = policy.delay_ms(attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = ((capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64)
                    .min(policy.max_delay_ms);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient API error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
