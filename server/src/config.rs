//! Configuration management

use appcatalog_core::{Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_DATABASE_URL: &str = "sqlite:data/appcatalog.db";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Upper bound on pooled connections for a file database
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl Config {
    /// Load configuration from file or environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            Self::load_from_file(p)
        } else {
            Self::load_from_env()
        }
    }

    /// Load from configuration file
    fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    fn load_from_env() -> Result<Self> {
        let database_url = get_secret("DATABASE_URL").unwrap_or_else(default_database_url);

        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => Some(value.trim().parse().map_err(|_| {
                Error::ConfigError(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", value))
            })?),
            Err(_) => None,
        };

        Ok(Config {
            database_url,
            max_connections,
        })
    }
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

/// Get secret from environment variable or file
///
/// If `VAR_NAME` is not set, `VAR_NAME_FILE` may point to a file holding the
/// value (Docker and Kubernetes secrets).
pub fn get_secret(var_name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(var_name) {
        return Some(value);
    }

    let file_var = format!("{}_FILE", var_name);
    if let Ok(path) = std::env::var(&file_var) {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            return Some(contents.trim().to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert!(config.max_connections.is_none());
    }

    #[test]
    fn test_parse_file_values() {
        let config = Config::parse(
            r#"
            database_url = "sqlite::memory:"
            max_connections = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, Some(2));
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let err = Config::parse("database_url = ").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Some("/nonexistent/appcatalog.toml")).is_err());
    }

    #[test]
    fn test_secret_from_file() {
        let path = std::env::temp_dir().join("appcatalog_secret_test");
        std::fs::write(&path, "sqlite:/srv/catalog.db\n").unwrap();
        std::env::set_var("APPCATALOG_TEST_SECRET_FILE", &path);

        assert_eq!(
            get_secret("APPCATALOG_TEST_SECRET").as_deref(),
            Some("sqlite:/srv/catalog.db")
        );
        assert!(get_secret("APPCATALOG_TEST_UNSET").is_none());

        std::env::remove_var("APPCATALOG_TEST_SECRET_FILE");
        let _ = std::fs::remove_file(path);
    }
}
