//! Response classification and retry policy with exponential backoff.
//!
//! This module provides [`FetchOutcome`], the per-attempt classification of
//! a response, and [`RetryPolicy`], which decides whether and when a failed
//! attempt is retried.
//!
//! # Overview
//!
//! Every attempt ends in exactly one [`FetchOutcome`]:
//! - [`FetchOutcome::Success`] - 200 with a non-empty body (or a cache hit)
//! - [`FetchOutcome::RateLimited`] - 429, optionally with a Retry-After delay
//! - [`FetchOutcome::TransientError`] - transport failure, 408 or 5xx
//! - [`FetchOutcome::PermanentError`] - anything else, including an empty 200
//!
//! # Example
//!
//! ```
//! use boxscore_core::fetch::{FailureType, FetchOutcome, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! let outcome = FetchOutcome::from_response(503, String::new(), None);
//! assert_eq!(outcome.failure_type(), Some(FailureType::Transient));
//!
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::FetchError;
use super::constants::{BACKOFF_BASE, BACKOFF_CAP, BACKOFF_JITTER_MS};
use super::rate_gate::parse_retry_after;

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Classification of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Usable page text. The body is never empty.
    Success {
        /// Raw response text.
        body: String,
        /// Whether the body was served from the cache.
        from_cache: bool,
    },

    /// HTTP 429.
    RateLimited {
        /// Server-requested delay, uncapped, when the header was usable.
        retry_after: Option<Duration>,
    },

    /// Failure that may succeed on retry.
    TransientError {
        /// HTTP status, absent for transport failures.
        status: Option<u16>,
        /// Human-readable cause.
        cause: String,
    },

    /// Failure that will not succeed on retry.
    PermanentError {
        /// HTTP status, absent for non-HTTP causes.
        status: Option<u16>,
        /// Human-readable cause.
        cause: String,
    },
}

impl FetchOutcome {
    /// Classifies a completed HTTP exchange.
    ///
    /// | Status | Body | Outcome |
    /// |--------|------|---------|
    /// | 200 | non-empty | Success |
    /// | 200 | empty | PermanentError |
    /// | 429 | - | RateLimited |
    /// | 408, 5xx | - | TransientError |
    /// | other | - | PermanentError |
    #[must_use]
    pub fn from_response(status: u16, body: String, retry_after: Option<&str>) -> Self {
        match status {
            200 if !body.is_empty() => Self::Success {
                body,
                from_cache: false,
            },
            200 => Self::PermanentError {
                status: Some(200),
                cause: "empty response body".to_string(),
            },
            429 => Self::RateLimited {
                retry_after: retry_after.and_then(parse_retry_after),
            },
            408 | 500..=599 => Self::TransientError {
                status: Some(status),
                cause: format!("HTTP {status}"),
            },
            _ => Self::PermanentError {
                status: Some(status),
                cause: format!("HTTP {status}"),
            },
        }
    }

    /// Classifies a request that never produced a response.
    ///
    /// Timeouts and transport errors are transient; a malformed URL or a
    /// client that could not be built is permanent.
    #[must_use]
    pub fn from_error(error: &FetchError) -> Self {
        match error {
            FetchError::Timeout { .. } | FetchError::Network { .. } => Self::TransientError {
                status: None,
                cause: error.to_string(),
            },
            FetchError::HttpStatus { status, .. } => Self::PermanentError {
                status: Some(*status),
                cause: error.to_string(),
            },
            FetchError::RateLimited { retry_after, .. } => Self::RateLimited {
                retry_after: *retry_after,
            },
            FetchError::InvalidUrl { .. }
            | FetchError::ClientBuild(_)
            | FetchError::EmptyBody { .. }
            | FetchError::Exhausted { .. } => Self::PermanentError {
                status: None,
                cause: error.to_string(),
            },
        }
    }

    /// Wraps a cached body. Empty bodies are never cached, so this is a hit.
    #[must_use]
    pub fn cached(body: String) -> Self {
        Self::Success {
            body,
            from_cache: true,
        }
    }

    /// The retry class of a failed outcome, `None` for success.
    #[must_use]
    pub fn failure_type(&self) -> Option<FailureType> {
        match self {
            Self::Success { .. } => None,
            Self::RateLimited { .. } => Some(FailureType::RateLimited),
            Self::TransientError { .. } => Some(FailureType::Transient),
            Self::PermanentError { .. } => Some(FailureType::Permanent),
        }
    }

    /// Short description used in logs and in [`FetchError::Exhausted`].
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Success { from_cache, .. } => {
                if *from_cache {
                    "cache hit".to_string()
                } else {
                    "HTTP 200".to_string()
                }
            }
            Self::RateLimited { .. } => "HTTP 429 Too Many Requests".to_string(),
            Self::TransientError { cause, .. } | Self::PermanentError { cause, .. } => {
                cause.clone()
            }
        }
    }
}

/// Retry class of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Network blip, timeout, 408 or 5xx.
    Transient,

    /// Unexpected status or unusable response.
    Permanent,

    /// HTTP 429.
    RateLimited,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// Backoff delay before the next attempt.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1), max_delay) + jitter
/// ```
///
/// With defaults, delays are approximately: 8s, 16s, 30s, 30s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap (before jitter).
    max_delay: Duration,

    /// Multiplier applied each attempt.
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: BACKOFF_BASE,
            max_delay: BACKOFF_CAP,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether the attempt that just failed should be retried.
    ///
    /// `attempt` is 1-indexed. Rate-limited attempts are budgeted like
    /// transient ones; their delay is chosen by the caller from Retry-After.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.backoff_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the delay after a failed attempt: exponential part capped,
    /// then jitter added.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.capped_exponential(attempt) + jitter()
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn capped_exponential(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * self.backoff_multiplier.powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(BACKOFF_JITTER_MS))
}
