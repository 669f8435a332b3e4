use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `NEXUS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    ClickHouse,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "clickhouse" => Ok(Self::ClickHouse),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    /// JSON fixture loaded into the memory backend at startup.
    #[serde(default)]
    pub fixture_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    #[serde(default = "default_clickhouse_url")]
    pub url: String,
    #[serde(default = "default_clickhouse_db")]
    pub database: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session token -> company id.
    #[serde(default)]
    pub sessions: HashMap<String, Uuid>,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

// Default functions
fn default_instance_id() -> String {
    "nexus-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}
fn default_clickhouse_db() -> String {
    "nexus_analytics".to_string()
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_cookie_name() -> String {
    "analytics-session".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            fixture_path: None,
        }
    }
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_clickhouse_url(),
            database: default_clickhouse_db(),
            user: None,
            password: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
            cookie_name: default_cookie_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instance_id: default_instance_id(),
            api: ApiConfig::default(),
            store: StoreConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            metrics: MetricsConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file and environment variables.
    /// Environment variables take precedence over the file.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path.unwrap_or("nexus")).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix("NEXUS")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.auth.cookie_name, "analytics-session");
        assert!(config.auth.sessions.is_empty());
    }

    #[test]
    fn test_partial_toml() {
        let raw = r#"
            [store]
            backend = "clickhouse"

            [auth.sessions]
            dev-token = "4f8c2a5e-0b1d-4c3a-9e7f-1a2b3c4d5e6f"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.store.backend, StoreBackend::ClickHouse);
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.auth.sessions.len(), 1);
    }

    #[test]
    fn test_env_overrides() {
        let vars = [
            ("NEXUS__STORE__BACKEND", "clickhouse"),
            ("NEXUS__INSTANCE_ID", "nexus-test"),
            ("NEXUS__CLICKHOUSE__URL", "http://ch.internal:8123"),
            ("NEXUS__API__HTTP_PORT", "9000"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let loaded = AppConfig::load(None);
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let config = loaded.unwrap();
        assert_eq!(config.store.backend, StoreBackend::ClickHouse);
        assert_eq!(config.instance_id, "nexus-test");
        assert_eq!(config.clickhouse.url, "http://ch.internal:8123");
        assert_eq!(config.api.http_port, 9000);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("ClickHouse".parse::<StoreBackend>(), Ok(StoreBackend::ClickHouse));
        assert!("mongo".parse::<StoreBackend>().is_err());
    }
}
