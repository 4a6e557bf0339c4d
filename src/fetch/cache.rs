//! Persistent response cache with a time-to-live.
//!
//! Entries are keyed by the normalized request URL and expire purely by
//! age; expiry is checked lazily at lookup. The cache is advisory: any
//! storage failure degrades to a miss (lookup) or a no-op (store) and is
//! only logged.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::Row;
use tracing::{debug, instrument, warn};

use crate::db::Database;

/// One cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Normalized URL.
    pub key: String,
    /// Response text exactly as stored.
    pub body: String,
    /// Unix seconds at which the entry was written.
    pub stored_at: i64,
}

impl CacheEntry {
    /// Whether the entry is older than `ttl` at `now` (unix seconds).
    #[must_use]
    pub fn is_expired(&self, ttl: Duration, now: i64) -> bool {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        now.saturating_sub(self.stored_at) >= ttl_secs
    }
}

/// TTL cache of response bodies stored in SQLite.
#[derive(Debug, Clone)]
pub struct HttpCache {
    db: Database,
    ttl: Duration,
}

impl HttpCache {
    /// Creates a cache over an opened database.
    #[must_use]
    pub fn new(db: Database, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached body for `url` if present and fresh.
    #[instrument(skip(self), fields(key))]
    pub async fn lookup(&self, url: &str) -> Option<String> {
        let key = normalize_cache_key(url);
        tracing::Span::current().record("key", key.as_str());

        let entry = match self.read_entry(&key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(error = %e, "unreadable cache entry, treating as miss");
                return None;
            }
        };

        if entry.is_expired(self.ttl, unix_now()) {
            debug!(stored_at = entry.stored_at, "cache entry expired");
            return None;
        }
        if entry.body.is_empty() {
            debug!("empty cached body, treating as miss");
            return None;
        }

        debug!("cache hit");
        Some(entry.body)
    }

    /// Records `body` for `url`, replacing any previous entry.
    ///
    /// Empty bodies are never stored.
    #[instrument(skip(self, body), fields(key, bytes = body.len()))]
    pub async fn store(&self, url: &str, body: &str) {
        if body.is_empty() {
            return;
        }
        let key = normalize_cache_key(url);
        tracing::Span::current().record("key", key.as_str());

        let result = sqlx::query(
            "INSERT INTO http_cache (key, body, stored_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, stored_at = excluded.stored_at",
        )
        .bind(&key)
        .bind(body)
        .bind(unix_now())
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => debug!("stored response in cache"),
            Err(e) => warn!(error = %e, "failed to store response in cache"),
        }
    }

    /// Deletes every expired entry, returning how many were removed.
    ///
    /// Lookups never need this; it only keeps the file from growing.
    ///
    /// # Errors
    ///
    /// Returns the underlying sqlx error if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, sqlx::Error> {
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let cutoff = unix_now().saturating_sub(ttl_secs);
        let result = sqlx::query("DELETE FROM http_cache WHERE stored_at <= ?")
            .bind(cutoff)
            .execute(self.db.pool())
            .await?;
        debug!(removed = result.rows_affected(), "purged expired cache entries");
        Ok(result.rows_affected())
    }

    async fn read_entry(&self, key: &str) -> Result<Option<CacheEntry>, sqlx::Error> {
        let row = sqlx::query("SELECT key, body, stored_at FROM http_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|row| -> Result<CacheEntry, sqlx::Error> {
            Ok(CacheEntry {
                key: row.try_get("key")?,
                body: row.try_get("body")?,
                stored_at: row.try_get("stored_at")?,
            })
        })
        .transpose()
    }
}

/// Normalizes a URL into a cache key.
///
/// Scheme and host are lowercased by the parser, default ports and the
/// fragment are dropped. Input that does not parse is used trimmed.
#[must_use]
pub fn normalize_cache_key(url: &str) -> String {
    match url::Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.trim().to_string(),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn test_cache(ttl: Duration) -> HttpCache {
        HttpCache::new(Database::new_in_memory().await.unwrap(), ttl)
    }

    #[test]
    fn test_normalize_cache_key_lowercases_host_and_drops_fragment() {
        assert_eq!(
            normalize_cache_key("HTTPS://Example.COM/boxscores/G1.htm#team_stats"),
            "https://example.com/boxscores/G1.htm"
        );
    }

    #[test]
    fn test_normalize_cache_key_drops_default_port() {
        assert_eq!(
            normalize_cache_key("https://example.com:443/a"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_normalize_cache_key_unparseable_is_trimmed() {
        assert_eq!(normalize_cache_key("  not a url "), "not a url");
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = CacheEntry {
            key: "k".to_string(),
            body: "b".to_string(),
            stored_at: 1_000,
        };
        let ttl = Duration::from_secs(60);
        assert!(!entry.is_expired(ttl, 1_059));
        assert!(entry.is_expired(ttl, 1_060));
    }

    #[tokio::test]
    async fn test_store_then_lookup_returns_identical_body() {
        let cache = test_cache(Duration::from_secs(3600)).await;
        let body = "<html><!-- <table id=\"team_stats\"></table> --></html>";

        cache.store("https://example.com/boxscores/g1.htm", body).await;

        assert_eq!(
            cache.lookup("https://example.com/boxscores/g1.htm").await.as_deref(),
            Some(body)
        );
    }

    #[tokio::test]
    async fn test_lookup_uses_normalized_key() {
        let cache = test_cache(Duration::from_secs(3600)).await;
        cache.store("https://EXAMPLE.com/g1.htm", "body").await;

        assert_eq!(
            cache.lookup("https://example.com/g1.htm#x").await.as_deref(),
            Some("body")
        );
    }

    #[tokio::test]
    async fn test_lookup_miss() {
        let cache = test_cache(Duration::from_secs(3600)).await;
        assert_eq!(cache.lookup("https://example.com/none.htm").await, None);
    }

    #[tokio::test]
    async fn test_store_replaces_previous_entry() {
        let cache = test_cache(Duration::from_secs(3600)).await;
        cache.store("https://example.com/a", "first").await;
        cache.store("https://example.com/a", "second").await;

        assert_eq!(
            cache.lookup("https://example.com/a").await.as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_empty_body_not_stored() {
        let cache = test_cache(Duration::from_secs(3600)).await;
        cache.store("https://example.com/a", "").await;
        assert_eq!(cache.lookup("https://example.com/a").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = test_cache(Duration::from_secs(60)).await;
        sqlx::query("INSERT INTO http_cache (key, body, stored_at) VALUES (?, ?, ?)")
            .bind("https://example.com/old")
            .bind("stale")
            .bind(unix_now() - 120)
            .execute(cache.db.pool())
            .await
            .unwrap();

        assert_eq!(cache.lookup("https://example.com/old").await, None);
    }

    #[tokio::test]
    async fn test_purge_expired_removes_only_old_rows() {
        let cache = test_cache(Duration::from_secs(60)).await;
        sqlx::query("INSERT INTO http_cache (key, body, stored_at) VALUES (?, ?, ?)")
            .bind("https://example.com/old")
            .bind("stale")
            .bind(unix_now() - 120)
            .execute(cache.db.pool())
            .await
            .unwrap();
        cache.store("https://example.com/new", "fresh").await;

        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(
            cache.lookup("https://example.com/new").await.as_deref(),
            Some("fresh")
        );
    }

    #[tokio::test]
    async fn test_unreadable_cache_is_a_miss() {
        let cache = test_cache(Duration::from_secs(60)).await;
        sqlx::query("DROP TABLE http_cache")
            .execute(cache.db.pool())
            .await
            .unwrap();

        assert_eq!(cache.lookup("https://example.com/a").await, None);
        // Store must not panic either.
        cache.store("https://example.com/a", "body").await;
    }
}
