//! Bounded retry for flaky network calls.
//!
//! Classifies which pipeline errors are transient and re-runs an operation
//! with a fixed delay between attempts.

use crate::error::{PipelineError, PipelineResult};
use std::future::Future;
use std::time::Duration;

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Treated as at least 1.
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(2000),
        }
    }
}

/// Determine whether a pipeline error is worth retrying.
///
/// Retryable errors: timeouts, connection failures, rate limits (429),
/// server errors (5xx). Everything else is permanent, including failed
/// predictions whatever their error text says.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } | PipelineError::Connection { .. } => true,
        _ => error
            .status_code()
            .is_some_and(|code| code == 429 || (500..=599).contains(&code)),
    }
}

/// Run `op` until it succeeds, fails permanently, or `policy.max_attempts`
/// attempts have been made. The last error is returned on exhaustion.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                tracing::warn!(
                    "{label} attempt {attempt}/{max_attempts} failed: {e}. Retrying in {:?}",
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if is_retryable(&e) {
                    tracing::error!("{label} failed after {max_attempts} attempts: {e}");
                }
                return Err(e);
            }
        }
    }
}
