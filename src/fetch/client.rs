//! HTTP transport for page fetches.
//!
//! This module provides the `HttpClient` struct which performs one GET with
//! independent connect and read timeouts and hands back the raw status,
//! body and Retry-After header. It never retries; that is the fetcher's job.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, instrument};
use url::Url;

use super::FetchError;
use super::constants::USER_AGENT;
use super::retry::FetchOutcome;

/// One completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded response text (may be empty).
    pub body: String,
    /// Raw Retry-After header, if any.
    pub retry_after: Option<String>,
}

impl RawResponse {
    /// Classifies this response.
    #[must_use]
    pub fn into_outcome(self) -> FetchOutcome {
        FetchOutcome::from_response(self.status, self.body, self.retry_after.as_deref())
    }
}

/// HTTP client for page fetches.
///
/// Create once and reuse, taking advantage of connection pooling.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use boxscore_core::fetch::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(Duration::from_secs(6), Duration::from_secs(15))?;
/// let response = client.get("https://example.com/boxscores/g1.htm").await?;
/// println!("HTTP {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the given connect and read timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the TLS backend or system
    /// configuration prevents building a client.
    #[instrument(level = "debug")]
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .gzip(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self { client })
    }

    /// Issues a single GET and returns whatever the server said.
    ///
    /// Non-2xx statuses are not errors here; they are data for the
    /// classifier.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] for malformed URLs,
    /// [`FetchError::Timeout`] when a connect/read timeout fires and
    /// [`FetchError::Network`] for other transport failures.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
        if Url::parse(url).is_err() {
            return Err(FetchError::invalid_url(url));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_transport_error(url, e))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(url, e))?;

        debug!(status, bytes = body.len(), "response received");

        Ok(RawResponse {
            status,
            body,
            retry_after,
        })
    }
}

fn map_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(url)
    } else {
        FetchError::network(url, error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new(Duration::from_secs(2), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_get_rejects_invalid_url() {
        let result = tokio_test::block_on(client().get("definitely-not-a-url"));
        assert!(
            matches!(result, Err(FetchError::InvalidUrl { .. })),
            "Expected InvalidUrl, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_get_connection_refused_is_transport_error() {
        // Port 9 (discard) on localhost is almost never listening.
        let result = client().get("http://127.0.0.1:9/boxscores/x.htm").await;
        assert!(
            matches!(
                result,
                Err(FetchError::Network { .. } | FetchError::Timeout { .. })
            ),
            "Expected transport error, got: {result:?}"
        );
    }

    #[test]
    fn test_raw_response_into_outcome() {
        let response = RawResponse {
            status: 429,
            body: String::new(),
            retry_after: Some("3".to_string()),
        };
        assert_eq!(
            response.into_outcome(),
            FetchOutcome::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
    }
}
