use crate::config::FetchConfig;
use crate::error::{AppError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

/// Outcome of a single upstream attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    /// Transient failure. Consumes one retry.
    Retry(String),
    /// Upstream asked us to wait. Does not consume a retry.
    RateLimited(Duration),
    /// Permanent failure for this request.
    GiveUp(String),
}

/// Fixed retry budget with linearly increasing delay.
///
/// Clones share one pool of request permits. A permit is held only while an
/// attempt runs, never across a backoff or rate-limit wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_rate_limit_waits: u32,
    permits: Arc<Semaphore>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_delay,
            max_rate_limit_waits: config.max_rate_limit_waits,
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds, gives up, or the budget is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let mut retries = 0u32;
        let mut rate_limit_waits = 0u32;

        loop {
            let attempt = {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|e| AppError::Internal(format!("request permits closed: {}", e)))?;
                op().await
            };

            match attempt {
                Attempt::Done(value) => return Ok(value),
                Attempt::GiveUp(reason) => {
                    return Err(AppError::DataUnavailable(format!("{}: {}", label, reason)));
                }
                Attempt::RateLimited(wait) => {
                    rate_limit_waits += 1;
                    if rate_limit_waits > self.max_rate_limit_waits {
                        warn!(
                            "{} still rate limited after {} waits. Giving up",
                            label, self.max_rate_limit_waits
                        );
                        return Err(AppError::RateLimited {
                            retry_after_secs: wait.as_secs(),
                        });
                    }
                    warn!("Rate limited on {}. Waiting {:?}", label, wait);
                    tokio::time::sleep(wait).await;
                }
                Attempt::Retry(reason) => {
                    if retries >= self.max_retries {
                        return Err(AppError::DataUnavailable(format!(
                            "{}: {} (after {} retries)",
                            label, reason, retries
                        )));
                    }
                    retries += 1;
                    let delay = self.backoff(retries);
                    warn!(
                        "{} failed: {}. Retry {}/{} in {:?}",
                        label, reason, retries, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
