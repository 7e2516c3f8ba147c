//! Caller-side retry for transient failures
//!
//! Clients make exactly one request; the pipeline wraps the calls that are
//! safe to repeat in a [`RetryPolicy`].

use crate::error::VoiceError;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Linear backoff: the wait before attempt `n + 1` is `base_delay × n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy that makes a single attempt
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, VoiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VoiceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt = attempt, operation = operation_name, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && is_transient(&e) => {
                    let delay = self.base_delay * attempt;
                    warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        operation = operation_name,
                        error = %e,
                        "Transient failure, will retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Whether a failure may succeed on a later attempt
///
/// Rate limits, server errors and network failures are transient; bad
/// input, bad credentials and empty results are not.
pub fn is_transient(error: &VoiceError) -> bool {
    match error {
        VoiceError::NetworkError { .. } => true,
        VoiceError::TranscriptionFailed {
            status: Some(status),
            ..
        }
        | VoiceError::ChatFailed {
            status: Some(status),
            ..
        } => *status == 429 || (500..600).contains(status),
        _ => false,
    }
}
