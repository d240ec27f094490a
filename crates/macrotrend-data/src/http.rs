//! Shared HTTP plumbing for the upstream clients.

use crate::error::{DataError, Result};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// User agent sent with every upstream request
const USER_AGENT: &str = concat!("macrotrend/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Spaces requests at least `min_interval` apart.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) const fn new(min_interval: Duration) -> Self {
        Self {
            last_request: None,
            min_interval,
        }
    }

    pub(crate) async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

pub(crate) fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(DataError::Network)
}
