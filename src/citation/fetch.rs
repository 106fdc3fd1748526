//! Article download with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`PageFetcher`]: Core trait defining an async page download
//! - [`HttpFetcher`]: `reqwest` implementation
//! - [`RetryFetch`]: Decorator that adds retry logic to any `PageFetcher`
//!
//! # Retry Strategy
//!
//! - Only transient failures are retried (transport errors, 429 and 5xx)
//! - Exponential backoff starting at `base_delay`
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use super::CitationError;
use crate::config::HttpConfig;
use rand::{Rng, rng};
use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Trait for downloading a page body.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CitationError>;
}

/// Plain HTTP fetcher backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, CitationError> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Article request returned an error status");
            return Err(CitationError::Status(status));
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Downloaded article"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PageFetcher`].
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Retries allowed after the first attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl((attempt - 1) as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetcher for RetryFetch<T>
where
    T: PageFetcher,
{
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, CitationError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() giving up"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    /// Fails with the queued errors, then succeeds.
    struct FlakyFetcher {
        failures: Mutex<Vec<CitationError>>,
        calls: Mutex<usize>,
    }

    impl FlakyFetcher {
        fn new(failures: Vec<CitationError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl PageFetcher for &FlakyFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, CitationError> {
            *self.calls.lock().unwrap() += 1;
            match self.failures.lock().unwrap().pop() {
                Some(e) => Err(e),
                None => Ok("<html></html>".to_string()),
            }
        }
    }

    fn unavailable() -> CitationError {
        CitationError::Status(StatusCode::SERVICE_UNAVAILABLE)
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let inner = FlakyFetcher::new(vec![unavailable(), unavailable()]);
        let fetcher = RetryFetch::new(&inner, 2, Duration::from_millis(1));
        assert_eq!(fetcher.fetch("https://example.com").await.unwrap(), "<html></html>");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = FlakyFetcher::new(vec![unavailable(), unavailable(), unavailable()]);
        let fetcher = RetryFetch::new(&inner, 1, Duration::from_millis(1));
        let err = fetcher.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, CitationError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_failures() {
        let inner = FlakyFetcher::new(vec![CitationError::Status(StatusCode::NOT_FOUND)]);
        let fetcher = RetryFetch::new(&inner, 5, Duration::from_millis(1));
        assert!(fetcher.fetch("https://example.com").await.is_err());
        assert_eq!(inner.calls(), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let inner = FlakyFetcher::new(vec![]);
        let fetcher = RetryFetch::new(&inner, 10, Duration::from_secs(1));
        assert!(fetcher.backoff(1) >= Duration::from_secs(1));
        assert!(fetcher.backoff(1) <= Duration::from_millis(1250));
        assert!(fetcher.backoff(40) <= Duration::from_millis(30_250));
    }
}
