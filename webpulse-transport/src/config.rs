//! Transport configuration.
//!
//! Values are forwarded to reqwest where it has a matching setting. Defaults
//! follow the values commonly used for pooled service-to-service clients.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;

/// Prefix of the environment variables read by [`WebClientConfig::with_env_overrides`].
pub const ENV_PREFIX: &str = "WEBPULSE_";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config document could not be parsed.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override had an invalid value.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// A default header was invalid.
    #[error("Invalid default header {name:?}: {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionPoolConfig {
    /// Maximum pooled connections per host.
    pub max_connections: usize,
    /// How long to wait for a pooled connection, in milliseconds.
    pub pending_acquire_timeout_ms: u64,
    /// Idle time before a pooled connection is closed, in milliseconds.
    pub max_idle_time_ms: u64,
    /// Maximum lifetime of a connection, in milliseconds.
    pub max_life_time_ms: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 400,
            pending_acquire_timeout_ms: 31_000,
            max_idle_time_ms: 31_000,
            max_life_time_ms: 300_000,
        }
    }
}

impl ConnectionPoolConfig {
    /// Idle timeout as a duration.
    pub fn max_idle_time(&self) -> Duration {
        Duration::from_millis(self.max_idle_time_ms)
    }

    /// Connection lifetime as a duration.
    pub fn max_life_time(&self) -> Duration {
        Duration::from_millis(self.max_life_time_ms)
    }

    /// Pending acquire timeout as a duration.
    pub fn pending_acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.pending_acquire_timeout_ms)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Socket read timeout in milliseconds.
    pub socket_timeout_ms: u64,
    /// Per-route timeout overrides in milliseconds, keyed by `host` or `host:port`.
    pub max_ttl_per_route: HashMap<String, u64>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            socket_timeout_ms: 30_000,
            max_ttl_per_route: HashMap::new(),
        }
    }
}

impl HttpClientConfig {
    /// Set the timeout override for a route.
    pub fn set_max_ttl_for_route(&mut self, route: impl Into<String>, ttl_ms: u64) {
        self.max_ttl_per_route.insert(route.into(), ttl_ms);
    }

    /// Get the timeout override for a route.
    pub fn max_ttl_for_route(&self, route: &str) -> Option<Duration> {
        self.max_ttl_per_route
            .get(route)
            .copied()
            .map(Duration::from_millis)
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Socket timeout as a duration.
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebClientConfig {
    /// Connection pool settings.
    pub connection_pool: ConnectionPoolConfig,
    /// HTTP client settings.
    pub http_client: HttpClientConfig,
    /// Maximum bytes buffered per response body; 0 means unlimited.
    pub max_in_memory_size: usize,
    /// Headers sent with every request unless the request sets them.
    pub default_headers: BTreeMap<String, String>,
}

impl WebClientConfig {
    /// Create a default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `WEBPULSE_*` environment variable overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (used by
    /// [`with_env_overrides`](Self::with_env_overrides)).
    ///
    /// Recognized keys: `WEBPULSE_MAX_CONNECTIONS`,
    /// `WEBPULSE_PENDING_ACQUIRE_TIMEOUT_MS`, `WEBPULSE_MAX_IDLE_TIME_MS`,
    /// `WEBPULSE_MAX_LIFE_TIME_MS`, `WEBPULSE_CONNECT_TIMEOUT_MS`,
    /// `WEBPULSE_SOCKET_TIMEOUT_MS`, `WEBPULSE_MAX_IN_MEMORY_SIZE`.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |name: &str| -> Result<Option<u64>, ConfigError> {
            let key = format!("{ENV_PREFIX}{name}");
            match lookup(&key) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidEnv { key, value }),
            }
        };

        if let Some(v) = read("MAX_CONNECTIONS")? {
            self.connection_pool.max_connections = v as usize;
        }
        if let Some(v) = read("PENDING_ACQUIRE_TIMEOUT_MS")? {
            self.connection_pool.pending_acquire_timeout_ms = v;
        }
        if let Some(v) = read("MAX_IDLE_TIME_MS")? {
            self.connection_pool.max_idle_time_ms = v;
        }
        if let Some(v) = read("MAX_LIFE_TIME_MS")? {
            self.connection_pool.max_life_time_ms = v;
        }
        if let Some(v) = read("CONNECT_TIMEOUT_MS")? {
            self.http_client.connect_timeout_ms = v;
        }
        if let Some(v) = read("SOCKET_TIMEOUT_MS")? {
            self.http_client.socket_timeout_ms = v;
        }
        if let Some(v) = read("MAX_IN_MEMORY_SIZE")? {
            self.max_in_memory_size = v as usize;
        }
        Ok(self)
    }

    /// Add a default header.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = WebClientConfig::default();
        assert_eq!(config.connection_pool.max_connections, 400);
        assert_eq!(config.connection_pool.pending_acquire_timeout_ms, 31_000);
        assert_eq!(config.connection_pool.max_idle_time(), Duration::from_secs(31));
        assert_eq!(config.connection_pool.max_life_time(), Duration::from_secs(300));
        assert_eq!(config.http_client.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.http_client.socket_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_in_memory_size, 0);
    }

    #[test]
    fn test_partial_json() {
        let config = WebClientConfig::from_json_str(
            r#"{
                "connection_pool": {"max_connections": 10},
                "http_client": {"max_ttl_per_route": {"api.internal": 5000}},
                "max_in_memory_size": 1048576
            }"#,
        )
        .unwrap();

        assert_eq!(config.connection_pool.max_connections, 10);
        assert_eq!(config.connection_pool.max_idle_time_ms, 31_000);
        assert_eq!(
            config.http_client.max_ttl_for_route("api.internal"),
            Some(Duration::from_secs(5))
        );
        assert_eq!(config.http_client.max_ttl_for_route("other"), None);
        assert_eq!(config.max_in_memory_size, 1_048_576);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            WebClientConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WEBPULSE_MAX_CONNECTIONS", "50"),
            ("WEBPULSE_SOCKET_TIMEOUT_MS", " 1500 "),
        ]
        .into_iter()
        .collect();

        let config = WebClientConfig::default()
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.connection_pool.max_connections, 50);
        assert_eq!(config.http_client.socket_timeout_ms, 1500);
        assert_eq!(config.http_client.connect_timeout_ms, 30_000);
    }

    #[test]
    fn test_invalid_override() {
        let err = WebClientConfig::default()
            .apply_overrides(|k| (k == "WEBPULSE_MAX_IDLE_TIME_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("WEBPULSE_MAX_IDLE_TIME_MS"));
    }

    #[test]
    fn test_route_ttl_setter() {
        let mut http = HttpClientConfig::default();
        http.set_max_ttl_for_route("svc:8080", 250);
        assert_eq!(http.max_ttl_for_route("svc:8080"), Some(Duration::from_millis(250)));
    }
}
