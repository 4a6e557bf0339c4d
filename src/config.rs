//! Fetch configuration loaded from the environment.
//!
//! Every knob has a documented default so an empty environment yields a
//! usable, polite configuration. Malformed values are reported as
//! [`ConfigError`] naming the offending variable; they are the only fatal
//! errors at startup.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Default base URL of the box-score host.
pub const DEFAULT_BASE_URL: &str = "https://www.pro-football-reference.com";

/// Default on-disk location of the response cache.
pub const DEFAULT_CACHE_PATH: &str = "http_cache.db";

const DEFAULT_MIN_INTERVAL_SECS: f64 = 2.0;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 6.0;
const DEFAULT_READ_TIMEOUT_SECS: f64 = 15.0;
const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;
const DEFAULT_RETRY_AFTER_CAP_SECS: f64 = 45.0;

/// Environment variable names.
pub mod env {
    pub const MIN_INTERVAL: &str = "BOXSCORE_MIN_INTERVAL";
    pub const MAX_ATTEMPTS: &str = "BOXSCORE_MAX_ATTEMPTS";
    pub const CONNECT_TIMEOUT: &str = "BOXSCORE_CONNECT_TIMEOUT";
    pub const READ_TIMEOUT: &str = "BOXSCORE_READ_TIMEOUT";
    pub const CACHE_SECS: &str = "BOXSCORE_CACHE_SECS";
    pub const RETRY_AFTER_CAP: &str = "BOXSCORE_RETRY_AFTER_CAP";
    pub const RATE_LIMIT_POLICY: &str = "BOXSCORE_RATE_LIMIT_POLICY";
    pub const BASE_URL: &str = "BOXSCORE_BASE_URL";
    pub const CACHE_PATH: &str = "BOXSCORE_CACHE_PATH";
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value as found.
        value: String,
        /// What was expected.
        reason: &'static str,
    },
}

/// What to do when the host answers HTTP 429.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitPolicy {
    /// Sleep for the (capped) Retry-After delay and retry, consuming attempts.
    #[default]
    Backoff,
    /// Give up on this URL immediately so the caller can defer it to a later run.
    Skip,
}

impl FromStr for RateLimitPolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backoff" => Ok(Self::Backoff),
            "skip" => Ok(Self::Skip),
            _ => Err("expected `skip` or `backoff`"),
        }
    }
}

impl fmt::Display for RateLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backoff => f.write_str("backoff"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

/// All tunables of the fetch layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Minimum spacing between non-cached requests.
    pub min_interval: Duration,
    /// Attempts per URL, including the first (always at least 1).
    pub max_attempts: u32,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Per-read timeout while receiving the body.
    pub read_timeout: Duration,
    /// Cache time-to-live; zero disables the cache.
    pub cache_ttl: Duration,
    /// Upper bound on any Retry-After derived sleep.
    pub retry_after_cap: Duration,
    /// Reaction to HTTP 429.
    pub rate_limit_policy: RateLimitPolicy,
    /// Scheme and host the box-score paths are appended to.
    pub base_url: String,
    /// SQLite file backing the response cache.
    pub cache_path: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs_f64(DEFAULT_MIN_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            connect_timeout: Duration::from_secs_f64(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs_f64(DEFAULT_READ_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            retry_after_cap: Duration::from_secs_f64(DEFAULT_RETRY_AFTER_CAP_SECS),
            rate_limit_policy: RateLimitPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
        }
    }
}

impl FetchConfig {
    /// Loads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// Unset and blank variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first malformed variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        };

        let mut config = Self::default();

        if let Some((name, v)) = get(env::MIN_INTERVAL) {
            config.min_interval = parse_seconds(name, &v)?;
        }
        if let Some((name, v)) = get(env::MAX_ATTEMPTS) {
            let attempts = v.parse::<u32>().map_err(|_| invalid(name, &v, "expected a whole number"))?;
            config.max_attempts = attempts.max(1);
        }
        if let Some((name, v)) = get(env::CONNECT_TIMEOUT) {
            config.connect_timeout = parse_seconds(name, &v)?;
        }
        if let Some((name, v)) = get(env::READ_TIMEOUT) {
            config.read_timeout = parse_seconds(name, &v)?;
        }
        if let Some((name, v)) = get(env::CACHE_SECS) {
            let secs = v.parse::<u64>().map_err(|_| invalid(name, &v, "expected whole seconds"))?;
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some((name, v)) = get(env::RETRY_AFTER_CAP) {
            config.retry_after_cap = parse_seconds(name, &v)?;
        }
        if let Some((name, v)) = get(env::RATE_LIMIT_POLICY) {
            config.rate_limit_policy = v.parse().map_err(|reason| invalid(name, &v, reason))?;
        }
        if let Some((name, v)) = get(env::BASE_URL) {
            if url::Url::parse(&v).is_err() {
                return Err(invalid(name, &v, "expected an absolute URL"));
            }
            config.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some((_, v)) = get(env::CACHE_PATH) {
            config.cache_path = PathBuf::from(v);
        }

        debug!(?config, "fetch configuration loaded");
        Ok(config)
    }

    /// Whether responses are cached at all.
    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        !self.cache_ttl.is_zero()
    }
}

fn parse_seconds(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let secs = value
        .parse::<f64>()
        .map_err(|_| invalid(name, value, "expected seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| invalid(name, value, "expected non-negative seconds"))
}

fn invalid(name: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        let config = FetchConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, FetchConfig::default());
        assert_eq!(config.min_interval, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(6));
        assert_eq!(config.read_timeout, Duration::from_secs(15));
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.retry_after_cap, Duration::from_secs(45));
        assert_eq!(config.rate_limit_policy, RateLimitPolicy::Backoff);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = FetchConfig::from_lookup(lookup_from(&[
            (env::MIN_INTERVAL, "0.5"),
            (env::MAX_ATTEMPTS, "3"),
            (env::CACHE_SECS, "0"),
            (env::RATE_LIMIT_POLICY, "SKIP"),
            (env::BASE_URL, "http://127.0.0.1:9000/"),
        ]))
        .unwrap();

        assert_eq!(config.min_interval, Duration::from_millis(500));
        assert_eq!(config.max_attempts, 3);
        assert!(!config.cache_enabled());
        assert_eq!(config.rate_limit_policy, RateLimitPolicy::Skip);
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = FetchConfig::from_lookup(lookup_from(&[(env::MAX_ATTEMPTS, "  ")])).unwrap();
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let config = FetchConfig::from_lookup(lookup_from(&[(env::MAX_ATTEMPTS, "0")])).unwrap();
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_malformed_value_names_variable() {
        let err = FetchConfig::from_lookup(lookup_from(&[(env::READ_TIMEOUT, "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: env::READ_TIMEOUT, .. }
        ));
        assert!(err.to_string().contains("BOXSCORE_READ_TIMEOUT"));
    }

    #[test]
    fn test_negative_seconds_rejected() {
        let result = FetchConfig::from_lookup(lookup_from(&[(env::MIN_INTERVAL, "-1")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result = FetchConfig::from_lookup(lookup_from(&[(env::RATE_LIMIT_POLICY, "hammer")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [RateLimitPolicy::Backoff, RateLimitPolicy::Skip] {
            assert_eq!(policy.to_string().parse::<RateLimitPolicy>().unwrap(), policy);
        }
    }
}
