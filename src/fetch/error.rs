//! Error types for the fetch module.
//!
//! Every variant carries the URL it concerns so a batch log line is
//! actionable on its own.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by [`Fetcher::fetch`](super::Fetcher::fetch).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The host answered 429 and the skip policy is active.
    ///
    /// The caller is expected to defer this identifier to a later run.
    #[error("rate limited fetching {url} (retry after {retry_after:?})")]
    RateLimited {
        /// The URL that was rate limited.
        url: String,
        /// Server-requested delay, already capped.
        retry_after: Option<Duration>,
    },

    /// A retryable failure persisted through every allowed attempt.
    #[error("gave up on {url} after {attempts} attempts: {last_cause}")]
    Exhausted {
        /// The URL that kept failing.
        url: String,
        /// Attempts used, including the first.
        attempts: u32,
        /// Description of the final failure.
        last_cause: String,
    },

    /// An HTTP status that will not improve on retry.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// HTTP 200 with nothing in it.
    #[error("empty response body fetching {url}")]
    EmptyBody {
        /// The URL that returned no content.
        url: String,
    },

    /// Transport failure (DNS, connection refused/reset, body decode, ...).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Connect or read timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Whether this failure only means "try again in a later run".
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_display_names_url_and_attempts() {
        let error = FetchError::Exhausted {
            url: "https://example.com/boxscores/g1.htm".to_string(),
            attempts: 5,
            last_cause: "HTTP 503".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("https://example.com/boxscores/g1.htm"), "Expected URL in: {msg}");
        assert!(msg.contains("5 attempts"), "Expected attempt count in: {msg}");
        assert!(msg.contains("503"), "Expected last cause in: {msg}");
    }

    #[test]
    fn test_rate_limited_is_flagged() {
        let error = FetchError::RateLimited {
            url: "https://example.com/".to_string(),
            retry_after: Some(Duration::from_secs(10)),
        };
        assert!(error.is_rate_limited());
        assert!(!FetchError::timeout("https://example.com/").is_rate_limited());
    }

    #[test]
    fn test_http_status_display() {
        let msg = FetchError::http_status("https://example.com/missing", 404).to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("/missing"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_empty_body_display() {
        let msg = FetchError::EmptyBody {
            url: "https://example.com/".to_string(),
        }
        .to_string();
        assert!(msg.contains("empty response body"));
    }
}
