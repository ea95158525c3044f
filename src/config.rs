//! Configuration management for Noteguard.
//!
//! All configuration comes from the process environment (with a best-effort
//! `.env` file loaded by `main`). The counter store endpoint and token and
//! the document store URI are required; missing either is fatal at startup.

use std::net::SocketAddr;

use crate::error::{NoteguardError, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5001;
const DEFAULT_DATABASE: &str = "noteguard";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Main configuration for the Noteguard service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Counter store configuration
    pub store: StoreConfig,

    /// Document store configuration
    pub database: DatabaseConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Broad per-request timeout in seconds, applied around all routes
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Resolve the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| NoteguardError::Config(format!("invalid bind address: {e}")))
    }
}

/// Connection settings for the counter store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// REST endpoint of the store
    pub url: String,

    /// Bearer token presented on every command
    pub token: String,

    /// Per-command timeout in seconds, nested inside the request timeout
    pub timeout_secs: u64,
}

/// Connection settings for the document store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// MongoDB connection string
    pub uri: String,

    /// Database name holding the notes collection
    pub database: String,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            request_timeout_secs: parse_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
        };

        let store = StoreConfig {
            url: require(&get, "UPSTASH_REDIS_REST_URL")?,
            token: require(&get, "UPSTASH_REDIS_REST_TOKEN")?,
            timeout_secs: parse_or(
                get("STORE_TIMEOUT_SECS"),
                "STORE_TIMEOUT_SECS",
                DEFAULT_STORE_TIMEOUT_SECS,
            )?,
        };

        let database = DatabaseConfig {
            uri: require(&get, "MONGODB_URI")?,
            database: get("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        };

        Ok(Self {
            server,
            store,
            database,
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(NoteguardError::Config(format!("{key} must be set"))),
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| NoteguardError::Config(format!("invalid value for {key}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("UPSTASH_REDIS_REST_URL", "https://store.example.com"),
            ("UPSTASH_REDIS_REST_TOKEN", "secret"),
            ("MONGODB_URI", "mongodb://localhost:27017"),
        ])
    }

    fn load(env: &HashMap<&str, &str>) -> Result<AppConfig> {
        AppConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.store.timeout_secs, 3);
        assert_eq!(config.database.database, "noteguard");
    }

    #[test]
    fn test_missing_store_url_is_fatal() {
        let mut env = base_env();
        env.remove("UPSTASH_REDIS_REST_URL");

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("UPSTASH_REDIS_REST_URL"));
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let mut env = base_env();
        env.insert("UPSTASH_REDIS_REST_TOKEN", "  ");

        assert!(load(&env).is_err());
    }

    #[test]
    fn test_missing_database_uri_is_fatal() {
        let mut env = base_env();
        env.remove("MONGODB_URI");

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("MONGODB_URI"));
    }

    #[test]
    fn test_overrides_parsed() {
        let mut env = base_env();
        env.insert("HOST", "127.0.0.1");
        env.insert("PORT", "8080");
        env.insert("STORE_TIMEOUT_SECS", "5");

        let config = load(&env).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.timeout_secs, 5);
        assert_eq!(
            config.server.socket_addr().unwrap().to_string(),
            "127.0.0.1:8080"
        );
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut env = base_env();
        env.insert("PORT", "not-a-port");

        assert!(load(&env).is_err());
    }
}
