//! Constants for the fetch module (backoff, jitter, Retry-After fallback).

use std::ops::RangeInclusive;
use std::time::Duration;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!(
    "boxscore/",
    env!("CARGO_PKG_VERSION"),
    " (research scraper; polite, cached, rate limited)"
);

/// Base delay for transport/5xx retries; doubled per attempt.
pub const BACKOFF_BASE: Duration = Duration::from_secs(8);

/// Upper bound on the exponential part of a retry delay.
pub const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Jitter added on top of every exponential backoff delay (milliseconds).
pub const BACKOFF_JITTER_MS: RangeInclusive<u64> = 100..=600;

/// Jitter added on top of a Retry-After delay (milliseconds).
pub const RATE_LIMIT_JITTER_MS: RangeInclusive<u64> = 200..=800;

/// Jitter added to a Rate Gate wait when one was needed (milliseconds).
pub const GATE_JITTER_MS: RangeInclusive<u64> = 50..=250;

/// Delay assumed when a 429 response has no usable Retry-After header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);
