//! Bounded retry with exponential backoff for transient HTTP failures.

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Exponential delay before retrying after `attempt` failed, without jitter.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(exp))
            .min(self.max_delay)
    }

    /// Delay before the next attempt, with up to 20% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_backoff(attempt);
        let jitter_ms = (base.as_millis() / 5) as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        (base + jitter).min(self.max_delay)
    }
}

/// Which failures a request may be repeated after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    /// Reads: throttling, server errors, timeouts and connect failures.
    Transient,
    /// Non-idempotent writes: only failures where the request was never
    /// processed, i.e. throttling and connect failures.
    Unprocessed,
}

impl RetryOn {
    fn status(self, status: StatusCode) -> bool {
        match self {
            Self::Transient => is_retryable_status(status),
            Self::Unprocessed => status == StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error(self, e: &reqwest::Error) -> bool {
        match self {
            Self::Transient => e.is_timeout() || e.is_connect(),
            Self::Unprocessed => e.is_connect(),
        }
    }
}

/// Statuses worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Parse a `Retry-After` header given in seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Send a request, retrying the failures `retry_on` allows.
///
/// `build` is called once per attempt. The last response is returned as-is
/// once attempts run out, so callers still map its status.
pub async fn send_with_retry<F>(
    policy: &RetryPolicy,
    retry_on: RetryOn,
    operation: &str,
    mut build: F,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 1;
    loop {
        let delay = match build().send().await {
            Ok(response) => {
                let status = response.status();
                if attempt >= policy.max_attempts || !retry_on.status(status) {
                    return Ok(response);
                }
                let delay = retry_after(response.headers())
                    .map(|d| d.min(policy.max_delay))
                    .unwrap_or_else(|| policy.backoff(attempt));
                warn!(
                    operation,
                    attempt,
                    status = status.as_u16(),
                    "Transient HTTP status; retrying after {:?}",
                    delay
                );
                delay
            }
            Err(e) if attempt < policy.max_attempts && retry_on.error(&e) => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation,
                    attempt,
                    error = %e,
                    "Request failed; retrying after {:?}",
                    delay
                );
                delay
            }
            Err(e) => return Err(e),
        };

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
