//! Configuration structure for the TVM service.
//!
//! Grounded on the teacher's `config::settings::AppConfig`: the same
//! `#[validate(nested)]` composition, the same `validate_custom` pass for
//! checks the `validator` crate can't express declaratively. The `xds`
//! section is dropped (out of scope); `auth` is rebuilt as `TvmAuthConfig`
//! around the two named options spec §6 requires
//! (`MaxTokenDuration`/`LoginTokenDuration`) instead of JWT signing config.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::errors::{Result, TvmError};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub observability: ObservabilityConfig,
    #[validate(nested)]
    pub auth: TvmAuthConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(TvmError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks the `validator` derive can't express declaratively.
    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(TvmError::validation(
                "database URL must use the 'sqlite:' scheme (TVM's only supported backend, e.g. 'sqlite://./data/tvm.db' or 'sqlite::memory:')",
            ));
        }

        if self.auth.login_token_duration_seconds > self.auth.max_token_duration_seconds {
            return Err(TvmError::validation(
                "LoginTokenDuration must not exceed MaxTokenDuration",
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, timeout_seconds: 30 }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Database configuration. SQLite is TVM's only supported backend.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    #[validate(range(min = 1, max = 60, message = "Connect timeout must be between 1 and 60 seconds"))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds; 0 means no timeout.
    pub idle_timeout_seconds: u64,

    /// Run migrations automatically at pool creation.
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/tvm.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_seconds != 0).then(|| Duration::from_secs(self.idle_timeout_seconds))
    }
}

/// Observability configuration for logging and metrics.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    pub enable_metrics: bool,

    /// Prometheus exporter bind port; 0 disables it.
    #[validate(range(max = 65535, message = "Metrics port must be <= 65535"))]
    pub metrics_port: u16,

    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit JSON-structured log lines instead of the human-readable format.
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            metrics_port: 9090,
            service_name: "tvm".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    pub fn metrics_bind_address(&self) -> Option<String> {
        (self.metrics_port != 0).then(|| format!("0.0.0.0:{}", self.metrics_port))
    }
}

/// TVM-specific authorization configuration: the two named options spec §6
/// requires, `MaxTokenDuration` and `LoginTokenDuration`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TvmAuthConfig {
    /// Upper bound on any token's lifetime (spec §3 invariant 5).
    #[validate(range(min = 1, message = "MaxTokenDuration must be at least 1 second"))]
    pub max_token_duration_seconds: u64,

    /// Default lifetime for tokens issued by `Exchange`.
    #[validate(range(min = 1, message = "LoginTokenDuration must be at least 1 second"))]
    pub login_token_duration_seconds: u64,
}

impl Default for TvmAuthConfig {
    fn default() -> Self {
        Self {
            max_token_duration_seconds: 30 * 24 * 60 * 60,
            login_token_duration_seconds: 24 * 60 * 60,
        }
    }
}

impl TvmAuthConfig {
    pub fn max_token_duration(&self) -> Duration {
        Duration::from_secs(self.max_token_duration_seconds)
    }

    pub fn login_token_duration(&self) -> Duration {
        Duration::from_secs(self.login_token_duration_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_sqlite_url_is_rejected() {
        let mut config = AppConfig::default();
        config.database.url = "postgresql://localhost/tvm".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn login_duration_cannot_exceed_max_duration() {
        let mut config = AppConfig::default();
        config.auth.login_token_duration_seconds = config.auth.max_token_duration_seconds + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn server_bind_address_formats_host_and_port() {
        let config = ServerConfig { host: "0.0.0.0".to_string(), port: 8080, timeout_seconds: 30 };
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }
}
