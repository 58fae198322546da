use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Fixed-backoff retry for a single class of errors.
///
/// Errors rejected by the `should_retry` predicate are returned at once.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: usize,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// One retry after `backoff`.
    pub fn once(backoff: Duration) -> Self {
        Self::new(1, backoff)
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub async fn retry<F, Fut, T, E, P>(
        &self,
        operation_name: &str,
        should_retry: P,
        mut f: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !should_retry(&e) {
                        return Err(e);
                    }

                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "Operation failed after max retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = self.backoff.as_millis(),
                        error = %e,
                        "Operation failed, retrying"
                    );

                    sleep(self.backoff).await;
                }
            }
        }
    }
}
