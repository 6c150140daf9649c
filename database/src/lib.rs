//! Database layer for the application catalog, backed by SQLite

use std::str::FromStr;

use appcatalog_core::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

// Export models and queries
pub mod models;
pub mod queries;

pub use models::*;
pub use queries::*;

// Re-export sqlx types for convenience
pub use sqlx::{self, Pool as SqlxPool, Sqlite as SqlxSqlite};

// Embed migrations at compile time
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Database connection pool
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection with the default pool size
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(database_url, None).await
    }

    /// Create a new database connection
    ///
    /// `sqlite::memory:` gives a private in-memory catalog held by a single
    /// connection, whatever `max_connections` says.
    pub async fn connect(database_url: &str, max_connections: Option<u32>) -> Result<Self> {
        info!(url = %database_url, "Connecting to database");

        let in_memory = database_url.contains(":memory:");

        // Make sure the directory holding the database file exists
        if !in_memory {
            if let Some(path) = database_url.strip_prefix("sqlite:") {
                let path = path.trim_start_matches("//");
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        info!(dir = ?parent, "Creating database directory");
                        std::fs::create_dir_all(parent).map_err(|e| {
                            Error::DatabaseError(format!(
                                "Failed to create database directory: {}",
                                e
                            ))
                        })?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| Error::DatabaseError(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let (options, max_connections) = if in_memory {
            (options, 1)
        } else {
            (
                options.journal_mode(SqliteJournalMode::Wal),
                max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            )
        };

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            // The catalog lives only as long as its one connection
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| Error::DatabaseError(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| Error::DatabaseError(format!("Failed to run migrations: {}", e)))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the database connection
    pub async fn close(self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Fresh migrated in-memory catalog for tests
#[cfg(test)]
pub(crate) async fn test_pool() -> Pool<Sqlite> {
    let db = Database::new("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    db.pool().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_migrates() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();

        let fk: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(fk.0, 1);

        db.close().await.unwrap();
    }
}
