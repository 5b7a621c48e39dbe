//! Bounded retry with a fixed inter-attempt delay.
//!
//! Shared by the storage fetchers and the OCR submitter. The delay is a
//! blocking sleep on the calling worker; callers must not hold shared
//! locks across `run`.

use std::fmt::Display;
use std::time::Duration;

/// Total attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the attempt bound is reached. `op` receives the 1-based
    /// attempt number. The last error is returned unchanged.
    pub fn run<T, E, F, P>(&self, operation: &str, mut op: F, is_retryable: P) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && is_retryable(&e) => {
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if is_retryable(&e) {
                        tracing::warn!(operation, attempts = attempt, error = %e, "Retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}
