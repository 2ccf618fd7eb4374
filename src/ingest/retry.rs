// src/ingest/retry.rs
// Per-page fetch lifecycle: classify, back off, retry within a budget.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;

use super::source::{CatalogSource, RawPage, SourceError};
use super::CancelFlag;

/// Retry budget and per-kind backoff delays for one page.
/// `max_attempts` counts total fetch calls, not extra retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_delay: Duration,
    pub timeout_delay: Duration,
    pub error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_delay: Duration::from_secs(2),
            timeout_delay: Duration::from_secs(5),
            error_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, err: &SourceError) -> Duration {
        match err {
            SourceError::RateLimited => self.rate_limit_delay,
            SourceError::Timeout => self.timeout_delay,
            SourceError::Other(_) => self.error_delay,
        }
    }
}

/// Sleep seam so retry pacing is observable in tests without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Production sleeper backed by the Tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Terminal state of one page's fetch lifecycle.
#[derive(Debug)]
pub enum PageFetch {
    Fetched { page: RawPage, attempts: u32 },
    Abandoned { attempts: u32, last_error: SourceError },
    Cancelled { attempts: u32 },
}

/// Drives a single page from pending to a terminal state. Transient errors
/// back off with the per-kind delay until the attempt budget runs out; a
/// raised cancel flag stops before the next attempt.
pub async fn fetch_page_with_retry(
    source: &dyn CatalogSource,
    page: u32,
    per_page: u32,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancelFlag,
) -> PageFetch {
    let mut attempts = 0u32;
    loop {
        if cancel.is_cancelled() {
            return PageFetch::Cancelled { attempts };
        }
        attempts += 1;
        match source.fetch_page(page, per_page).await {
            Ok(raw) => {
                return PageFetch::Fetched {
                    page: raw,
                    attempts,
                }
            }
            Err(err) => {
                if attempts >= policy.max_attempts.max(1) {
                    tracing::warn!(
                        target: "ingest",
                        page,
                        attempts,
                        kind = err.kind(),
                        error = %err,
                        "page abandoned after exhausting retries"
                    );
                    return PageFetch::Abandoned {
                        attempts,
                        last_error: err,
                    };
                }
                let delay = policy.delay_for(&err);
                tracing::warn!(
                    target: "ingest",
                    page,
                    attempt = attempts,
                    kind = err.kind(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient source error, backing off"
                );
                counter!("ingest_page_retries_total").increment(1);
                sleeper.pause(delay).await;
            }
        }
    }
}
