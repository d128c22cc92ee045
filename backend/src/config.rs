//! Application configuration loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use crate::db::DatabaseConfig;
use crate::error::{AppError, Result};

pub const DEFAULT_PORT: u16 = 8009;
pub const DEFAULT_INCIDENT_QUERY_URL: &str = "http://localhost:8006/incident-query";
pub const DEFAULT_JWT_SECRET: &str = "secret_key";
pub const DEFAULT_CACHE_EXPIRATION_SECS: u64 = 300;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(AppError::Config(format!("Unknown LOG_FORMAT '{}'", other))),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    /// `None` when `REDIS_URL` is unset; the cache reports itself unhealthy.
    pub redis_url: Option<String>,
    pub incident_query_url: String,
    pub jwt_secret: String,
    pub cache_expiration_secs: u64,
    pub migrations_dir: PathBuf,
    /// Period of the background health monitor; 0 disables it.
    pub health_check_interval_secs: u64,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first
    /// when one is present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", non_empty("PORT"), DEFAULT_PORT)?,
            database: DatabaseConfig::from_lookup(&lookup)?,
            redis_url: non_empty("REDIS_URL"),
            incident_query_url: non_empty("INCIDENT_QUERY_URL")
                .unwrap_or_else(|| DEFAULT_INCIDENT_QUERY_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            jwt_secret: non_empty("JWT_SECRET_KEY")
                .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            cache_expiration_secs: parse_or(
                "CACHE_EXPIRATION_SECONDS",
                non_empty("CACHE_EXPIRATION_SECONDS"),
                DEFAULT_CACHE_EXPIRATION_SECS,
            )?,
            migrations_dir: non_empty("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./migrations")),
            health_check_interval_secs: parse_or(
                "HEALTH_CHECK_INTERVAL_SECS",
                non_empty("HEALTH_CHECK_INTERVAL_SECS"),
                60,
            )?,
            log_format: non_empty("LOG_FORMAT")
                .map(|v| v.parse::<LogFormat>())
                .transpose()?
                .unwrap_or(LogFormat::Pretty),
        })
    }

    /// Socket address string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an optional value, falling back to `default` when absent.
pub(crate) fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8009);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.incident_query_url, DEFAULT_INCIDENT_QUERY_URL);
        assert_eq!(config.jwt_secret, "secret_key");
        assert_eq!(config.cache_expiration_secs, 300);
        assert_eq!(config.health_check_interval_secs, 60);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.bind_addr(), "0.0.0.0:8009");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("INCIDENT_QUERY_URL", "http://incidents:8006/incident-query/"),
            ("CACHE_EXPIRATION_SECONDS", "60"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(
            config.incident_query_url,
            "http://incidents:8006/incident-query"
        );
        assert_eq!(config.cache_expiration_secs, 60);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = Config::from_lookup(lookup(&[("REDIS_URL", "  "), ("PORT", "")])).unwrap();
        assert_eq!(config.redis_url, None);
        assert_eq!(config.port, 8009);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = Config::from_lookup(lookup(&[("CACHE_EXPIRATION_SECONDS", "soon")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("CACHE_EXPIRATION_SECONDS"));
    }

    #[test]
    fn test_unknown_log_format() {
        assert!(Config::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).is_err());
    }
}
