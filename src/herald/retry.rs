// src/herald/retry.rs
use std::future::Future;
use std::time::Duration;

use crate::error::PublishError;

/// Bounded retry: only rate-limit signals are retried, at most `max_retries`
/// times, waiting the server-provided delay (capped at `max_wait`).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u8,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            max_wait: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub async fn run<F, Fut>(&self, channel: &str, mut op: F) -> Result<(), PublishError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), PublishError>>,
    {
        let mut attempt: u8 = 0;
        loop {
            match op().await {
                Ok(()) => return Ok(()),
                Err(PublishError::RateLimited { retry_after, .. }) if attempt < self.max_retries => {
                    attempt += 1;
                    let wait = retry_after.min(self.max_wait);
                    tracing::warn!(
                        target: "herald",
                        channel,
                        wait_secs = wait.as_secs(),
                        attempt,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn limited() -> PublishError {
        PublishError::RateLimited {
            channel: "x".into(),
            retry_after: Duration::from_secs(30),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limit_once_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let res = RetryPolicy::default()
            .run("x", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err(limited()) } else { Ok(()) } }
            })
            .await;
        assert!(res.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_rate_limit_surfaces() {
        let calls = AtomicUsize::new(0);
        let res = RetryPolicy::default()
            .run("x", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(limited()) }
            })
            .await;
        assert!(res.unwrap_err().is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let res = RetryPolicy::default()
            .run("x", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(PublishError::MissingContent {
                        channel: "x".into(),
                    })
                }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
