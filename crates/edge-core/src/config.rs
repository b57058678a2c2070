//! Application configuration.
//!
//! `AppConfig` is built once at process start (defaults, then an optional
//! TOML/JSON file, then environment variables) and handed to every component
//! that needs it. Nothing reads the environment after startup.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::region::Region;

/// Application name exposed to the presentation layer.
pub const APP_NAME: &str = "SSR Server Clock";

/// Base path for all API routes.
pub const API_BASE: &str = "/api";

/// Page description used in the HTML head.
pub const APP_DESCRIPTION: &str = "Multi-region SSR demo on the edge";

/// Logical key of the visit counter in each region's store.
pub const COUNTER_KEY: &str = "visits";

/// Key read by health checks.
pub const HEALTH_KEY: &str = "health";

/// Environment variables recognized by [`AppConfig::apply_env`].
pub mod env_keys {
    pub const COUNTER_TABLE: &str = "DYNAMODB_TABLE";
    pub const PRIMARY_REGION: &str = "PRIMARY_REGION";
    pub const DR_REGION: &str = "DR_REGION";
    pub const HEALTH_CHECK_INTERVAL_SECONDS: &str = "HEALTH_CHECK_INTERVAL_SECONDS";
    pub const FAILBACK_THRESHOLD: &str = "FAILBACK_THRESHOLD";
    pub const STORE_TIMEOUT_MS: &str = "STORE_TIMEOUT_MS";
    pub const HEALTH_CHECK_TIMEOUT_MS: &str = "HEALTH_CHECK_TIMEOUT_MS";
    pub const STORE_BACKEND: &str = "STORE_BACKEND";
    pub const PRIMARY_STORE_URL: &str = "PRIMARY_STORE_URL";
    pub const DR_STORE_URL: &str = "DR_STORE_URL";
    pub const WEATHER_API_URL: &str = "WEATHER_API_URL";
    pub const WEATHER_DEFAULT_CITY: &str = "WEATHER_DEFAULT_CITY";
    pub const WEATHER_CACHE_TTL_SECONDS: &str = "WEATHER_CACHE_TTL_SECONDS";
    pub const BIND_ADDR: &str = "BIND_ADDR";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which durable backend the regional stores use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local stores (development and tests).
    #[default]
    Memory,
    /// One Redis endpoint per region.
    Redis,
}

impl std::str::FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            _ => Err(()),
        }
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Counter table identifier; namespaces the counter key in every region.
    pub counter_table: String,
    /// Primary region identifier (e.g. "us-east-1").
    pub primary_region: String,
    /// DR region identifier (e.g. "us-west-2").
    pub dr_region: String,
    /// Seconds between scheduled health checks.
    pub health_check_interval_seconds: u64,
    /// Consecutive healthy primary checks required before failing back.
    pub failback_threshold: u32,
    /// Deadline for request-path store calls.
    pub store_timeout_ms: u64,
    /// Deadline for a single health check.
    pub health_check_timeout_ms: u64,
    /// Regional store backend.
    pub store_backend: StoreBackend,
    /// Connection URL of the primary store (Redis backend only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_store_url: Option<String>,
    /// Connection URL of the DR store (Redis backend only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dr_store_url: Option<String>,
    /// Base URL of the remote weather service.
    pub weather_api_url: String,
    /// City used when `/api/weather` is called without one.
    pub weather_default_city: String,
    /// How long a weather response is reused.
    pub weather_cache_ttl_seconds: u64,
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Log output format ("json" or "human").
    pub log_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            counter_table: "ssr-poc-visits".to_string(),
            primary_region: "us-east-1".to_string(),
            dr_region: "us-west-2".to_string(),
            health_check_interval_seconds: 15,
            failback_threshold: 3,
            store_timeout_ms: 1000,
            health_check_timeout_ms: 2000,
            store_backend: StoreBackend::Memory,
            primary_store_url: None,
            dr_store_url: None,
            weather_api_url: "https://wttr.in".to_string(),
            weather_default_city: "Seattle".to_string(),
            weather_cache_ttl_seconds: 300,
            bind_addr: "0.0.0.0:3000".to_string(),
            log_format: "json".to_string(),
        }
    }
}

/// Accepted `log_format` values.
pub const LOG_FORMATS: &[&str] = &["json", "human", "pretty", "text"];

impl AppConfig {
    /// Load configuration: defaults, optional file, then the process environment.
    ///
    /// Not validated; call [`AppConfig::validate`] once any remaining
    /// overrides are applied.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                message: e.to_string(),
            })
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                message: e.to_string(),
            })
        }
    }

    /// Overlay values from an environment lookup function.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(env_keys::COUNTER_TABLE) {
            self.counter_table = v;
        }
        if let Some(v) = lookup(env_keys::PRIMARY_REGION) {
            self.primary_region = v;
        }
        if let Some(v) = lookup(env_keys::DR_REGION) {
            self.dr_region = v;
        }
        if let Some(v) = lookup(env_keys::HEALTH_CHECK_INTERVAL_SECONDS) {
            self.health_check_interval_seconds =
                parse_number(env_keys::HEALTH_CHECK_INTERVAL_SECONDS, v)?;
        }
        if let Some(v) = lookup(env_keys::FAILBACK_THRESHOLD) {
            self.failback_threshold = parse_number(env_keys::FAILBACK_THRESHOLD, v)?;
        }
        if let Some(v) = lookup(env_keys::STORE_TIMEOUT_MS) {
            self.store_timeout_ms = parse_number(env_keys::STORE_TIMEOUT_MS, v)?;
        }
        if let Some(v) = lookup(env_keys::HEALTH_CHECK_TIMEOUT_MS) {
            self.health_check_timeout_ms = parse_number(env_keys::HEALTH_CHECK_TIMEOUT_MS, v)?;
        }
        if let Some(v) = lookup(env_keys::STORE_BACKEND) {
            self.store_backend = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: env_keys::STORE_BACKEND,
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup(env_keys::PRIMARY_STORE_URL) {
            self.primary_store_url = Some(v);
        }
        if let Some(v) = lookup(env_keys::DR_STORE_URL) {
            self.dr_store_url = Some(v);
        }
        if let Some(v) = lookup(env_keys::WEATHER_API_URL) {
            self.weather_api_url = v;
        }
        if let Some(v) = lookup(env_keys::WEATHER_DEFAULT_CITY) {
            self.weather_default_city = v;
        }
        if let Some(v) = lookup(env_keys::WEATHER_CACHE_TTL_SECONDS) {
            self.weather_cache_ttl_seconds =
                parse_number(env_keys::WEATHER_CACHE_TTL_SECONDS, v)?;
        }
        if let Some(v) = lookup(env_keys::BIND_ADDR) {
            self.bind_addr = v;
        }
        if let Some(v) = lookup(env_keys::LOG_FORMAT) {
            self.log_format = v;
        }
        Ok(())
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counter_table.trim().is_empty() {
            return Err(ConfigError::Invalid("counter_table must not be empty".into()));
        }
        if self.primary_region.trim().is_empty() || self.dr_region.trim().is_empty() {
            return Err(ConfigError::Invalid("region identifiers must not be empty".into()));
        }
        if self.primary_region == self.dr_region {
            return Err(ConfigError::Invalid(format!(
                "primary and DR region must differ (both are {})",
                self.primary_region
            )));
        }
        if self.failback_threshold == 0 {
            return Err(ConfigError::Invalid("failback_threshold must be at least 1".into()));
        }
        if self.health_check_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "health_check_interval_seconds must be at least 1".into(),
            ));
        }
        if self.store_timeout_ms == 0 || self.health_check_timeout_ms == 0 {
            return Err(ConfigError::Invalid("store timeouts must be non-zero".into()));
        }
        if !LOG_FORMATS.contains(&self.log_format.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_format must be one of {} (got {})",
                LOG_FORMATS.join(", "),
                self.log_format
            )));
        }
        if self.store_backend == StoreBackend::Redis
            && (self.primary_store_url.is_none() || self.dr_store_url.is_none())
        {
            return Err(ConfigError::Invalid(
                "redis backend requires primary_store_url and dr_store_url".into(),
            ));
        }
        Ok(())
    }

    /// Region identifier configured for a region.
    pub fn region_name(&self, region: Region) -> &str {
        match region {
            Region::Primary => &self.primary_region,
            Region::Dr => &self.dr_region,
        }
    }

    /// Store URL configured for a region.
    pub fn store_url(&self, region: Region) -> Option<&str> {
        match region {
            Region::Primary => self.primary_store_url.as_deref(),
            Region::Dr => self.dr_store_url.as_deref(),
        }
    }

    /// Interval between scheduled health checks.
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }

    /// Deadline for request-path store calls.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Deadline for one health check.
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    /// Lifetime of a cached weather response.
    pub fn weather_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_cache_ttl_seconds)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.counter_table, "ssr-poc-visits");
        assert_eq!(config.primary_region, "us-east-1");
        assert_eq!(config.dr_region, "us-west-2");
        assert_eq!(config.health_check_interval(), Duration::from_secs(15));
        assert_eq!(config.failback_threshold, 3);
        assert_eq!(config.health_check_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(lookup(&[
                ("DYNAMODB_TABLE", "visits-prod"),
                ("PRIMARY_REGION", "eu-west-1"),
                ("DR_REGION", "eu-central-1"),
                ("FAILBACK_THRESHOLD", "5"),
                ("HEALTH_CHECK_INTERVAL_SECONDS", " 30 "),
            ]))
            .unwrap();

        assert_eq!(config.counter_table, "visits-prod");
        assert_eq!(config.region_name(Region::Primary), "eu-west-1");
        assert_eq!(config.region_name(Region::Dr), "eu-central-1");
        assert_eq!(config.failback_threshold, 5);
        assert_eq!(config.health_check_interval_seconds, 30);
    }

    #[test]
    fn test_env_rejects_non_numeric() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(lookup(&[("FAILBACK_THRESHOLD", "three")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "FAILBACK_THRESHOLD", .. }
        ));
    }

    #[test]
    fn test_validate_rejects_same_regions() {
        let config = AppConfig {
            dr_region: "us-east-1".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_failback_threshold() {
        let config = AppConfig {
            failback_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_checks_log_format() {
        let mut config = AppConfig {
            log_format: "xml".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.log_format = "Pretty".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redis_backend_requires_urls() {
        let mut config = AppConfig {
            store_backend: StoreBackend::Redis,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.primary_store_url = Some("redis://primary:6379".into());
        config.dr_store_url = Some("redis://dr:6379".into());
        assert!(config.validate().is_ok());
        assert_eq!(config.store_url(Region::Dr), Some("redis://dr:6379"));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            counter_table = "visits-staging"
            failback_threshold = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.counter_table, "visits-staging");
        assert_eq!(config.failback_threshold, 4);
        assert_eq!(config.primary_region, "us-east-1");
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }
}
