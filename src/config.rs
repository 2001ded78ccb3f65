//! Configuration management

use anyhow::{self, Context, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOGS_DIR: &str = "./logs";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Upper bound of the connection pool
    pub database_max_connections: u32,

    /// Directory for the rolling log file
    pub logs_dir: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse_max_connections(&raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let logs_dir = lookup("LOGS_DIR").unwrap_or_else(|| DEFAULT_LOGS_DIR.to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            logs_dir,
        })
    }
}

fn parse_max_connections(raw: &str) -> Result<u32> {
    let value: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a number, got '{}'", raw))?;

    if value == 0 {
        anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_max_connections_parses() {
        assert_eq!(parse_max_connections("12").unwrap(), 12);
        assert_eq!(parse_max_connections(" 3 ").unwrap(), 3);
    }

    #[test]
    fn test_max_connections_rejects_garbage_and_zero() {
        assert!(parse_max_connections("many").is_err());
        assert!(parse_max_connections("0").is_err());
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults_when_optional_vars_unset() {
        let config = Config::from_lookup(vars(&[("DATABASE_URL", "postgres://test")])).unwrap();
        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.database_max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.logs_dir, DEFAULT_LOGS_DIR);
    }

    #[test]
    fn test_config_reads_optional_vars() {
        let config = Config::from_lookup(vars(&[
            ("DATABASE_URL", "postgres://test"),
            ("DATABASE_MAX_CONNECTIONS", "8"),
            ("LOGS_DIR", "/var/log/sta"),
        ]))
        .unwrap();
        assert_eq!(config.database_max_connections, 8);
        assert_eq!(config.logs_dir, "/var/log/sta");
    }

    #[test]
    fn test_config_requires_database_url() {
        let err = Config::from_lookup(vars(&[("LOGS_DIR", "/tmp")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_config_rejects_bad_max_connections() {
        let result = Config::from_lookup(vars(&[
            ("DATABASE_URL", "postgres://test"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]));
        assert!(result.is_err());
    }
}
