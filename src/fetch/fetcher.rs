//! Resilient page fetcher: cache, pacing, classification and retry.
//!
//! This module provides the [`Fetcher`], the only component that talks to
//! the network. One call to [`Fetcher::fetch`] is one logical request:
//!
//! 1. Consult the cache; a hit returns immediately without touching the gate.
//! 2. On a miss, pass the [`RateGate`] and issue the request.
//! 3. Classify the response into a [`FetchOutcome`] and either return,
//!    retry with backoff, or surface a typed [`FetchError`].
//!
//! # Example
//!
//! ```no_run
//! use boxscore_core::FetchConfig;
//! use boxscore_core::fetch::Fetcher;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::from_env()?;
//! let fetcher = Fetcher::new(&config, None)?;
//! let html = fetcher.fetch("https://www.pro-football-reference.com/boxscores/201809060phi.htm").await?;
//! println!("{} bytes", html.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, instrument, warn};

use super::FetchError;
use super::cache::HttpCache;
use super::client::HttpClient;
use super::constants::RATE_LIMIT_JITTER_MS;
use super::rate_gate::{RateGate, retry_after_delay};
use super::retry::{FailureType, FetchOutcome, RetryDecision, RetryPolicy};
use crate::config::{FetchConfig, RateLimitPolicy};

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Response text; never empty.
    pub body: String,
    /// Whether the body came from the cache.
    pub from_cache: bool,
    /// Attempts used, including the first.
    pub attempts: u32,
}

/// Counters accumulated across every fetch made by one [`Fetcher`].
///
/// Uses atomic counters so a fetcher shared behind `Arc` stays accurate.
#[derive(Debug, Default)]
pub struct FetchStats {
    cache_hits: AtomicUsize,
    requests: AtomicUsize,
    retried: AtomicUsize,
}

impl FetchStats {
    /// Returns the number of fetches served from the cache.
    #[must_use]
    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::SeqCst)
    }

    /// Returns the number of network requests issued.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Returns the number of retry sleeps taken.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }
}

/// Cache-aware, paced, retrying fetcher for a single host.
#[derive(Debug)]
pub struct Fetcher {
    client: HttpClient,
    gate: Arc<RateGate>,
    cache: Option<HttpCache>,
    policy: RetryPolicy,
    rate_limit_policy: RateLimitPolicy,
    retry_after_cap: Duration,
    stats: FetchStats,
}

impl Fetcher {
    /// Builds a fetcher from configuration.
    ///
    /// A fresh [`RateGate`] is created from `min_interval`; use
    /// [`with_gate`](Self::with_gate) to share one across fetchers.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &FetchConfig, cache: Option<HttpCache>) -> Result<Self, FetchError> {
        let client = HttpClient::new(config.connect_timeout, config.read_timeout)?;

        debug!(
            max_attempts = config.max_attempts,
            min_interval_ms = config.min_interval.as_millis(),
            policy = %config.rate_limit_policy,
            cache = cache.is_some(),
            "creating fetcher"
        );

        Ok(Self {
            client,
            gate: Arc::new(RateGate::new(config.min_interval)),
            cache,
            policy: RetryPolicy::with_max_attempts(config.max_attempts),
            rate_limit_policy: config.rate_limit_policy,
            retry_after_cap: config.retry_after_cap,
            stats: FetchStats::default(),
        })
    }

    /// Replaces the rate gate with a shared one.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<RateGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the rate gate this fetcher passes before every network request.
    #[must_use]
    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns the configured 429 policy.
    #[must_use]
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        self.rate_limit_policy
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Fetches `url` and returns its text.
    ///
    /// # Errors
    ///
    /// See [`fetch_page`](Self::fetch_page).
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.fetch_page(url).await?.body)
    }

    /// Fetches `url`, reporting where the body came from and how many
    /// attempts it took.
    ///
    /// # Errors
    ///
    /// - [`FetchError::RateLimited`] on HTTP 429 under the skip policy (one attempt used)
    /// - [`FetchError::Exhausted`] when a retryable failure outlives `max_attempts`
    /// - [`FetchError::HttpStatus`] / [`FetchError::EmptyBody`] for permanent responses
    /// - [`FetchError::InvalidUrl`] for malformed URLs
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_page(&self, url: &str) -> Result<Fetched, FetchError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            if let Some(cache) = &self.cache
                && let Some(body) = cache.lookup(url).await
            {
                self.stats.cache_hits.fetch_add(1, Ordering::SeqCst);
                debug!(attempt, "served from cache");
                return Ok(Fetched {
                    body,
                    from_cache: true,
                    attempts: attempt,
                });
            }

            self.gate.acquire().await;
            self.stats.requests.fetch_add(1, Ordering::SeqCst);
            debug!(attempt, "issuing request");

            let outcome = match self.client.get(url).await {
                Ok(response) => response.into_outcome(),
                Err(e) => {
                    let outcome = FetchOutcome::from_error(&e);
                    if outcome.failure_type() == Some(FailureType::Permanent) {
                        return Err(e);
                    }
                    outcome
                }
            };

            let delay = match outcome {
                FetchOutcome::Success { body, .. } => {
                    if let Some(cache) = &self.cache {
                        cache.store(url, &body).await;
                    }
                    debug!(attempt, bytes = body.len(), "fetched");
                    return Ok(Fetched {
                        body,
                        from_cache: false,
                        attempts: attempt,
                    });
                }
                FetchOutcome::PermanentError { status, cause } => {
                    debug!(attempt, %cause, "permanent failure, not retrying");
                    return Err(match status {
                        Some(200) => FetchError::EmptyBody {
                            url: url.to_string(),
                        },
                        Some(status) => FetchError::http_status(url, status),
                        None => FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last_cause: cause,
                        },
                    });
                }
                FetchOutcome::RateLimited { retry_after } => {
                    let wait = retry_after_delay(retry_after, self.retry_after_cap);
                    self.gate.record_rate_limit(wait);

                    if self.rate_limit_policy == RateLimitPolicy::Skip {
                        warn!(attempt, "rate limited - skipping for a later run");
                        return Err(FetchError::RateLimited {
                            url: url.to_string(),
                            retry_after: retry_after.map(|d| d.min(self.retry_after_cap)),
                        });
                    }

                    let outcome = FetchOutcome::RateLimited { retry_after };
                    self.next_delay(url, &outcome, attempt, |_| {
                        wait + Duration::from_millis(rand::thread_rng().gen_range(RATE_LIMIT_JITTER_MS))
                    })?
                }
                ref outcome @ FetchOutcome::TransientError { .. } => {
                    self.next_delay(url, outcome, attempt, |backoff| backoff)?
                }
            };

            self.stats.retried.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
        }
    }

    /// Consults the retry policy for a retryable outcome and returns the
    /// sleep before the next attempt, or the exhaustion error.
    fn next_delay<F>(
        &self,
        url: &str,
        outcome: &FetchOutcome,
        attempt: u32,
        choose_delay: F,
    ) -> Result<Duration, FetchError>
    where
        F: FnOnce(Duration) -> Duration,
    {
        let failure_type = outcome.failure_type().unwrap_or(FailureType::Transient);

        match self.policy.should_retry(failure_type, attempt) {
            RetryDecision::Retry {
                delay: backoff,
                attempt: next_attempt,
            } => {
                let delay = choose_delay(backoff);
                info!(
                    url = %url,
                    attempt = next_attempt,
                    max_attempts = self.policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    cause = %outcome.describe(),
                    "retrying fetch"
                );
                Ok(delay)
            }
            RetryDecision::DoNotRetry { reason } => {
                warn!(url = %url, attempt, %reason, cause = %outcome.describe(), "giving up");
                Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last_cause: outcome.describe(),
                })
            }
        }
    }
}
