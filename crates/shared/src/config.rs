//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Projection engine configuration.
    #[serde(default)]
    pub projection: ProjectionConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Projection engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionConfig {
    /// Maximum number of cached projection results.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Time-to-live for cached projection results, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Annual discount rate used when a scenario does not set one.
    #[serde(default = "default_discount_rate")]
    pub default_discount_rate: Decimal,
    /// Longest projection horizon the engine accepts, in months.
    #[serde(default = "default_max_horizon")]
    pub max_horizon_months: u32,
}

fn default_cache_capacity() -> u64 {
    100
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_discount_rate() -> Decimal {
    Decimal::new(12, 2)
}

fn default_max_horizon() -> u32 {
    240 // 20 years
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl(),
            default_discount_rate: default_discount_rate(),
            max_horizon_months: default_max_horizon(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CIMIENTO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_projection_defaults() {
        let config = ProjectionConfig::default();
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.default_discount_rate, dec!(0.12));
        assert_eq!(config.max_horizon_months, 240);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("CIMIENTO__SERVER__PORT", Some("9090")),
                (
                    "CIMIENTO__DATABASE__URL",
                    Some("postgres://localhost/cimiento_test"),
                ),
                ("CIMIENTO__PROJECTION__MAX_HORIZON_MONTHS", Some("120")),
                ("RUN_MODE", Some("test-nonexistent")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.database.url, "postgres://localhost/cimiento_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.projection.max_horizon_months, 120);
                assert_eq!(config.projection.cache_capacity, 100);
            },
        );
    }
}
