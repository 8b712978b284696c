use std::future::Future;
use std::time::Duration;

use super::types::{PipelineError, RunStage};
use crate::metrics::PipelineMetrics;

/// Bounded retry for external calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; values below one behave as one.
    pub max_attempts: u32,
    /// The n-th retry waits `n * backoff`.
    pub backoff: Duration,
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
///
/// Only errors reporting [`PipelineError::is_retryable`] are retried; the last error is
/// returned unchanged.
pub async fn retry_external<T, E, F, Fut>(
    stage: RunStage,
    policy: RetryPolicy,
    metrics: &PipelineMetrics,
    mut operation: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<PipelineError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await.map_err(Into::into) {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    stage = %stage,
                    attempt,
                    max_attempts,
                    error = %error,
                    "Transient failure; retrying"
                );
                metrics.record_retry();
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
