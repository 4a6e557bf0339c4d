//! Polite HTTP fetch layer for a single box-score host.
//!
//! This module turns a URL into page text while staying within the host's
//! tolerance: responses are cached, outbound requests are paced by a shared
//! gate, and failures are classified before deciding whether to retry.
//!
//! # Features
//!
//! - Persistent response cache with a configurable freshness window
//! - Minimum interval between network requests, with small jitter
//! - Exponential backoff for transient failures, capped and jittered
//! - HTTP 429 handling with a choice of skip or Retry-After backoff
//! - Structured error types naming the URL and attempt count
//!
//! # Example
//!
//! ```no_run
//! use boxscore_core::{Database, FetchConfig};
//! use boxscore_core::fetch::{Fetcher, HttpCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default();
//! let db = Database::new(&config.cache_path).await?;
//! let fetcher = Fetcher::new(&config, Some(HttpCache::new(db, config.cache_ttl)))?;
//! let html = fetcher
//!     .fetch("https://www.pro-football-reference.com/boxscores/201809060phi.htm")
//!     .await?;
//! println!("{} bytes", html.len());
//! # Ok(())
//! # }
//! ```

mod cache;
mod client;
mod constants;
mod error;
mod fetcher;
pub mod rate_gate;
mod retry;

pub use cache::{CacheEntry, HttpCache, normalize_cache_key};
pub use client::{HttpClient, RawResponse};
pub use constants::USER_AGENT;
pub use error::FetchError;
pub use fetcher::{FetchStats, Fetched, Fetcher};
pub use rate_gate::{RateGate, parse_retry_after, retry_after_delay};
pub use retry::{FailureType, FetchOutcome, RetryDecision, RetryPolicy};
