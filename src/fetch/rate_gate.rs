//! Request pacing for the single remote host.
//!
//! This module provides the [`RateGate`] struct which enforces a minimum
//! interval between outbound (non-cached) requests, plus the Retry-After
//! parsing used when the host pushes back with HTTP 429.
//!
//! # Overview
//!
//! The gate owns one "last request" timestamp behind a mutex. Callers that
//! share the gate through an `Arc` are serialized on that timestamp, so the
//! pacing holds even if several tasks fetch from the same host.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use boxscore_core::fetch::RateGate;
//!
//! # async fn example() {
//! let gate = Arc::new(RateGate::new(Duration::from_secs(2)));
//!
//! // First request proceeds immediately
//! gate.acquire().await;
//!
//! // Second request waits until two seconds have passed (plus jitter)
//! gate.acquire().await;
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{DEFAULT_RETRY_AFTER, GATE_JITTER_MS};

/// Warning threshold for cumulative pacing delay (5 minutes).
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(300);

/// Minimum-interval gate in front of the network.
///
/// `RateGate` is `Send + Sync`; wrap it in `Arc` and inject the same
/// instance into every fetcher that targets the host.
#[derive(Debug)]
pub struct RateGate {
    /// Minimum time between two requests.
    min_interval: Duration,

    /// Whether pacing is disabled (tests, `--min-interval 0`).
    disabled: bool,

    /// Time the previous request was released.
    /// `None` until the first acquire, which is never delayed.
    last_request: Mutex<Option<Instant>>,

    /// Number of completed `acquire` calls.
    acquisitions: AtomicU64,

    /// Total time spent waiting in this gate plus server-mandated delays.
    cumulative_delay_ms: AtomicU64,
}

impl RateGate {
    /// Creates a gate enforcing `min_interval` between requests.
    #[must_use]
    #[instrument(skip_all, fields(min_interval_ms = min_interval.as_millis()))]
    pub fn new(min_interval: Duration) -> Self {
        debug!("creating rate gate");
        Self {
            min_interval,
            disabled: min_interval.is_zero(),
            last_request: Mutex::new(None),
            acquisitions: AtomicU64::new(0),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Creates a gate that never waits but still counts acquisitions.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns whether pacing is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the configured minimum interval.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns how many times the gate has been passed.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Returns the total delay accounted to this gate so far.
    #[must_use]
    pub fn cumulative_delay(&self) -> Duration {
        Duration::from_millis(self.cumulative_delay_ms.load(Ordering::SeqCst))
    }

    /// Waits until `min_interval` has elapsed since the previous release,
    /// then records "now" as the new baseline.
    ///
    /// When a wait is needed a small random jitter is added so overlapping
    /// runs do not fall into lock-step. The first call never waits.
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        // Held across the sleep: concurrent callers queue up behind it.
        let mut last_request_guard = self.last_request.lock().await;

        if !self.disabled {
            if let Some(last_request) = *last_request_guard {
                let elapsed = last_request.elapsed();

                if elapsed < self.min_interval {
                    let jitter = Duration::from_millis(rand::thread_rng().gen_range(GATE_JITTER_MS));
                    let delay = self.min_interval.saturating_sub(elapsed) + jitter;
                    let cumulative = self.add_cumulative_delay(delay);

                    debug!(
                        delay_ms = delay.as_millis(),
                        cumulative_ms = cumulative.as_millis(),
                        "pacing request"
                    );

                    if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                        warn!(
                            cumulative_delay_secs = cumulative.as_secs(),
                            "long cumulative pacing delay - consider a smaller batch"
                        );
                    }

                    tokio::time::sleep(delay).await;
                }
            } else {
                debug!("first request - no delay");
            }
        }

        *last_request_guard = Some(Instant::now());
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
    }

    /// Records a server-mandated delay (from a 429 Retry-After).
    ///
    /// The delay itself is slept by the fetcher; this only keeps the
    /// cumulative accounting honest.
    pub fn record_rate_limit(&self, delay: Duration) {
        let cumulative = self.add_cumulative_delay(delay);

        debug!(
            delay_ms = delay.as_millis(),
            cumulative_ms = cumulative.as_millis(),
            "recorded server rate limit"
        );

        if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
            warn!(
                cumulative_delay_secs = cumulative.as_secs(),
                "excessive server rate limiting - host may be overloaded"
            );
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports two formats as per RFC 7231:
/// - Delta seconds: `Retry-After: 120` (fractions are accepted)
/// - HTTP-date: `Retry-After: Wed, 21 Oct 2025 07:28:00 GMT`
///
/// Returns `None` for negative or unparseable values. A date in the past
/// yields zero.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use boxscore_core::fetch::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("1.5"), Some(Duration::from_millis(1500)));
/// assert_eq!(parse_retry_after("-5"), None);
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            debug!(header_value, "negative or non-finite Retry-After value, ignoring");
            return None;
        }
        return Duration::try_from_secs_f64(seconds).ok();
    }

    match httpdate::parse_http_date(header_value) {
        Ok(datetime) => Some(
            datetime
                .duration_since(std::time::SystemTime::now())
                .unwrap_or(Duration::ZERO),
        ),
        Err(_) => {
            debug!(header_value, "unparseable Retry-After value");
            None
        }
    }
}

/// Computes how long to honor a 429: the server's requested delay, or the
/// default when the header was missing or unusable, never more than `cap`.
#[must_use]
pub fn retry_after_delay(requested: Option<Duration>, cap: Duration) -> Duration {
    let requested = requested.unwrap_or(DEFAULT_RETRY_AFTER);

    if requested > cap {
        warn!(
            requested_secs = requested.as_secs_f64(),
            cap_secs = cap.as_secs_f64(),
            "Retry-After exceeds cap, capping"
        );
        cap
    } else {
        requested
    }
}
