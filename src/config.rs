use std::env;
use std::str::FromStr;

use lambda_http::tracing::Level;

use crate::error::ServerError;

/// Which [`SiteStore`](crate::store::SiteStore) backs the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    DynamoDb,
    Memory,
}

impl FromStr for Backend {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(Backend::DynamoDb),
            "memory" => Ok(Backend::Memory),
            other => Err(ServerError::Configuration(format!(
                "unknown VISITS_STORE '{other}', expected 'dynamodb' or 'memory'"
            ))),
        }
    }
}

/// Function configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// DynamoDB region (default: "us-east-1")
    pub region: String,
    /// Visits table name (default: "crc_visits")
    pub table_name: String,
    /// Endpoint override, e.g. DynamoDB Local (default: none)
    pub endpoint_url: Option<String>,
    /// Store backend (default: DynamoDB)
    pub backend: Backend,
    /// Create the table at cold start when missing (default: false)
    pub ensure_table: bool,
    /// Maximum tracing level (default: INFO)
    pub log_level: Level,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LAMBDA_AWS_REGION` - DynamoDB region (default: "us-east-1")
    /// - `VISITS_TABLE` - table name (default: "crc_visits")
    /// - `DYNAMODB_ENDPOINT` - endpoint override (default: unset)
    /// - `VISITS_STORE` - "dynamodb" or "memory" (default: "dynamodb")
    /// - `VISITS_ENSURE_TABLE` - "true"/"false" (default: "false")
    /// - `LOG_LEVEL` - tracing level (default: "INFO")
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let backend = match lookup("VISITS_STORE") {
            Some(value) => value.parse()?,
            None => Backend::DynamoDb,
        };

        let ensure_table = match lookup("VISITS_ENSURE_TABLE") {
            Some(value) => value.parse().map_err(|_| {
                ServerError::Configuration(format!(
                    "VISITS_ENSURE_TABLE must be 'true' or 'false', got '{value}'"
                ))
            })?,
            None => false,
        };

        let log_level = match lookup("LOG_LEVEL") {
            Some(value) => value.parse().map_err(|_| {
                ServerError::Configuration(format!("invalid LOG_LEVEL '{value}'"))
            })?,
            None => Level::INFO,
        };

        Ok(Self {
            region: lookup("LAMBDA_AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            table_name: lookup("VISITS_TABLE").unwrap_or_else(|| "crc_visits".to_string()),
            endpoint_url: lookup("DYNAMODB_ENDPOINT").filter(|url| !url.is_empty()),
            backend,
            ensure_table,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ServerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).unwrap();

        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.table_name, "crc_visits");
        assert_eq!(config.endpoint_url, None);
        assert_eq!(config.backend, Backend::DynamoDb);
        assert!(!config.ensure_table);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("LAMBDA_AWS_REGION", "eu-west-1"),
            ("VISITS_TABLE", "visits_dev"),
            ("DYNAMODB_ENDPOINT", "http://localhost:8000"),
            ("VISITS_STORE", "Memory"),
            ("VISITS_ENSURE_TABLE", "true"),
            ("LOG_LEVEL", "debug"),
        ])
        .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.table_name, "visits_dev");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.backend, Backend::Memory);
        assert!(config.ensure_table);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_empty_endpoint_is_ignored() {
        let config = load(&[("DYNAMODB_ENDPOINT", "")]).unwrap();
        assert_eq!(config.endpoint_url, None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("VISITS_STORE", "redis")]),
            Err(ServerError::Configuration(_))
        ));
        assert!(matches!(
            load(&[("VISITS_ENSURE_TABLE", "yes")]),
            Err(ServerError::Configuration(_))
        ));
        assert!(matches!(
            load(&[("LOG_LEVEL", "loud")]),
            Err(ServerError::Configuration(_))
        ));
    }
}
