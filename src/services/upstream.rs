use crate::constants::RETRY_ONCE_MAX_ATTEMPTS;
use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;

/// Bounded retry without backoff. Every error is treated as retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy { max_attempts: 1 };
    pub const ONCE: RetryPolicy = RetryPolicy {
        max_attempts: RETRY_ONCE_MAX_ATTEMPTS,
    };

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        "{} failed, retrying (attempt {}/{}): {}",
                        label,
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Fail `fut` with an upstream timeout if it does not finish within `deadline`.
pub async fn with_deadline<T>(
    service: &'static str,
    deadline: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::upstream(
            service,
            format!("Request timed out after {}s", deadline.as_secs()),
        )),
    }
}
