use serde::Deserialize;
use std::net::SocketAddr;

use domain::services::PlanSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Only read when `storage.backend = "postgres"`.
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bulk_operations: BulkOperationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Where operation records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Records kept before the oldest is evicted.
    #[serde(default = "default_storage_capacity")]
    pub capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            capacity: default_storage_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

/// Limits and pacing for bulk operation processing.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkOperationsConfig {
    /// Maximum number of targets in one submission.
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,

    /// Batch size used when the request does not specify one.
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Pause after each batch, in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Operations allowed to run at once. Further submissions are rejected.
    #[serde(default = "default_max_concurrent_operations")]
    pub max_concurrent_operations: usize,

    #[serde(default = "default_per_item_estimate_ms")]
    pub per_item_estimate_ms: u64,

    #[serde(default = "default_large_operation_threshold")]
    pub large_operation_threshold: usize,

    /// How long shutdown waits for running operations.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for BulkOperationsConfig {
    fn default() -> Self {
        Self {
            max_targets: default_max_targets(),
            default_batch_size: default_batch_size(),
            max_batch_size: default_max_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            max_concurrent_operations: default_max_concurrent_operations(),
            per_item_estimate_ms: default_per_item_estimate_ms(),
            large_operation_threshold: default_large_operation_threshold(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl BulkOperationsConfig {
    pub fn plan_settings(&self) -> PlanSettings {
        PlanSettings {
            per_item_estimate_ms: self.per_item_estimate_ms,
            batch_delay_ms: self.batch_delay_ms,
            large_operation_threshold: self.large_operation_threshold,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_storage_capacity() -> usize {
    persistence::repositories::DEFAULT_CAPACITY
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_max_targets() -> usize {
    domain::services::DEFAULT_MAX_TARGETS
}
fn default_batch_size() -> usize {
    10
}
fn default_max_batch_size() -> usize {
    100
}
fn default_batch_delay_ms() -> u64 {
    100
}
fn default_max_concurrent_operations() -> usize {
    5
}
fn default_per_item_estimate_ms() -> u64 {
    50
}
fn default_large_operation_threshold() -> usize {
    500
}
fn default_shutdown_timeout() -> u64 {
    30
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with FS__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("FS")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults so tests do not depend on
    /// the working directory.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []

            [storage]
            backend = "memory"
            capacity = 1000

            [bulk_operations]
            max_targets = 1000
            default_batch_size = 10
            max_batch_size = 100
            batch_delay_ms = 100
            max_concurrent_operations = 5
            per_item_estimate_ms = 50
            large_operation_threshold = 500
            shutdown_timeout_secs = 30
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.backend == StorageBackend::Postgres {
            if self.database.url.is_empty() {
                return Err(ConfigValidationError::MissingRequired(
                    "FS__DATABASE__URL must be set when storage.backend is postgres".to_string(),
                ));
            }
            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigValidationError::InvalidValue(
                    "min_connections cannot exceed max_connections".to_string(),
                ));
            }
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.server.host.parse::<std::net::IpAddr>().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Server host must be an IP address, got '{}'",
                self.server.host
            )));
        }

        if self.storage.capacity == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "storage.capacity must be at least 1".to_string(),
            ));
        }

        let bulk = &self.bulk_operations;
        if bulk.max_targets == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "bulk_operations.max_targets must be at least 1".to_string(),
            ));
        }
        if bulk.max_batch_size == 0 || bulk.default_batch_size == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "bulk_operations batch sizes must be at least 1".to_string(),
            ));
        }
        if bulk.default_batch_size > bulk.max_batch_size {
            return Err(ConfigValidationError::InvalidValue(
                "bulk_operations.default_batch_size cannot exceed max_batch_size".to_string(),
            ));
        }
        if bulk.max_concurrent_operations == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "bulk_operations.max_concurrent_operations must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.server.port)
    }
}
