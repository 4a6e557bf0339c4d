//! SQLite store behind the response cache.
//!
//! One file holds the `http_cache` table; the schema is applied from the
//! embedded migrations every time the store is opened.
//!
//! ```no_run
//! use boxscore_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("http_cache.db")).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// The fetcher is sequential; a second connection only serves overlapping runs.
const MAX_CONNECTIONS: u32 = 2;

/// How long a write waits on another process holding the file lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors opening the cache store.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to open cache database: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("failed to apply cache schema: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Handle to the cache database. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the cache file at `db_path`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be opened or the schema
    /// cannot be applied.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        Self::migrated(pool).await
    }

    /// Opens a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the schema cannot be applied.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        // Each `:memory:` connection is its own database, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("cache schema ready");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_has_cache_table() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO http_cache (key, body, stored_at) VALUES ('https://example.com/', '<html>', 0)",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_ok(), "http_cache table should exist after migration");
    }

    #[tokio::test]
    async fn test_cache_key_is_unique() {
        let db = Database::new_in_memory().await.unwrap();
        let insert = "INSERT INTO http_cache (key, body, stored_at) VALUES ('k', 'b', 0)";

        sqlx::query(insert).execute(db.pool()).await.unwrap();
        let duplicate = sqlx::query(insert).execute(db.pool()).await;

        assert!(duplicate.is_err(), "plain INSERT of a duplicate key must fail");
    }

    #[tokio::test]
    async fn test_file_store_is_created_and_reopened() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("cache.db");

        let db = Database::new(&db_path).await.unwrap();
        sqlx::query("INSERT INTO http_cache (key, body, stored_at) VALUES ('k', 'b', 1)")
            .execute(db.pool())
            .await
            .unwrap();
        drop(db);
        assert!(db_path.exists());

        let reopened = Database::new(&db_path).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM http_cache")
            .fetch_one(reopened.pool())
            .await
            .unwrap();
        assert_eq!(count, 1, "rows persist across opens");

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(reopened.pool())
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
