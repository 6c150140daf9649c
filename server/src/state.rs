//! Application state

use std::sync::Arc;

use appcatalog_core::Result;
use appcatalog_database::{sqlx::SqlitePool, Database};
use tracing::info;

use crate::config::Config;

/// Shared application state
///
/// Cheap to clone; handlers receive it through axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
}

impl AppState {
    /// Open the catalog database and bring its schema up to date
    pub async fn new(config: Config) -> Result<Self> {
        let database = Database::connect(&config.database_url, config.max_connections).await?;
        database.migrate().await?;
        info!("Catalog database ready");

        Ok(Self {
            config: Arc::new(config),
            pool: database.pool().clone(),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
impl AppState {
    /// State over a fresh in-memory catalog
    pub async fn for_tests() -> Self {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: None,
        };
        Self::new(config).await.unwrap()
    }
}
