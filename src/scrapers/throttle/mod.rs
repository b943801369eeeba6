//! Request pacing, per-fetch timeouts and retries.
//!
//! Pages are requested one at a time. Every fetch attempt is bounded by a
//! timeout, failed attempts are optionally retried with backoff, and a fixed
//! pause follows every page whatever its outcome.

mod config;

use std::time::Duration;

use tracing::{debug, warn};

pub use config::RetryPolicy;

use super::{FetchFailure, FetchResult, Fetcher};
use crate::config::{Config, ConfigError};
use crate::models::FetchRequest;

/// Result of fetching one page through the throttle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottledFetch {
    pub result: FetchResult,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Sequential pacing controller for page fetches.
#[derive(Debug, Clone)]
pub struct Throttle {
    delay: Duration,
    fetch_timeout: Duration,
    retry: RetryPolicy,
}

impl Throttle {
    pub fn new(delay: Duration, fetch_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            delay,
            fetch_timeout,
            retry,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate_timeouts()?;
        Ok(Self::new(
            config.request_delay(),
            config.fetch_timeout(),
            config.retry.clone(),
        ))
    }

    /// A zero fetch timeout would fail every page before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("fetch timeout"));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch `url`, retrying per the policy. Never sleeps the inter-page delay.
    pub async fn fetch(&self, fetcher: &dyn Fetcher, url: &str) -> ThrottledFetch {
        let mut request = FetchRequest::first(url);

        loop {
            match self.attempt(fetcher, &request).await {
                Ok(body) => {
                    return ThrottledFetch {
                        result: Ok(body),
                        attempts: request.attempt,
                    }
                }
                Err(failure) if request.attempt <= self.retry.max_retries => {
                    let wait = self.retry.delay_before_retry(request.attempt);
                    debug!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        request.attempt, request.page_url, failure, wait
                    );
                    tokio::time::sleep(wait).await;
                    request = request.next_attempt();
                }
                Err(failure) => {
                    if request.attempt > 1 {
                        warn!(
                            "Giving up on {} after {} attempts",
                            request.page_url, request.attempt
                        );
                    }
                    return ThrottledFetch {
                        result: Err(failure),
                        attempts: request.attempt,
                    };
                }
            }
        }
    }

    async fn attempt(&self, fetcher: &dyn Fetcher, request: &FetchRequest) -> FetchResult {
        match tokio::time::timeout(self.fetch_timeout, fetcher.fetch(&request.page_url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchFailure::Transport(format!(
                "fetch timed out after {:?}",
                self.fetch_timeout
            ))),
        }
    }

    /// Sleep the fixed inter-page delay.
    pub async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        debug!("Waiting {:?} before next request", self.delay);
        tokio::time::sleep(self.delay).await;
    }
}
