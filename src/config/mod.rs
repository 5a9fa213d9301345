//! Configuration loading.
//!
//! Defaults → optional file → `TVM_`-prefixed environment variables, via the
//! `config` crate, exactly the order the teacher's `config::load_config`
//! uses (just rebranded from the `MAGAYA_` prefix to `TVM_`).

pub mod settings;

pub use settings::{AppConfig, DatabaseConfig, ObservabilityConfig, ServerConfig, TvmAuthConfig};

use crate::errors::{Result, TvmError};
use config::{Config, Environment, File};
use std::path::Path;

/// Load configuration from defaults, an optional file, and `TVM_`-prefixed
/// environment variables (later sources override earlier ones).
pub fn load_config<P: AsRef<Path>>(config_path: Option<P>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    builder = builder.add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        let path = path.as_ref();
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(TvmError::config(format!("configuration file not found: {}", path.display())));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("TVM").separator("_").try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| TvmError::config_with_source("failed to build configuration", Box::new(e)))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| TvmError::config_with_source("failed to deserialize configuration", Box::new(e)))?;

    app_config.validate()?;

    Ok(app_config)
}

/// Load configuration from environment variables only (containerized deploys).
pub fn load_config_from_env() -> Result<AppConfig> {
    load_config::<&str>(None)
}

/// Load configuration from a YAML file, layered over defaults and env vars.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    load_config(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default_config() {
        let config = load_config_from_env().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn env_vars_override_defaults() {
        env::set_var("TVM_SERVER_PORT", "9090");
        let config = load_config_from_env().unwrap();
        assert_eq!(config.server.port, 9090);
        env::remove_var("TVM_SERVER_PORT");
    }

    #[test]
    fn file_overrides_defaults_and_env_overrides_file() {
        env::set_var("TVM_SERVER_PORT", "7777");

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"server:\n  host: \"0.0.0.0\"\n  port: 8888\n")
            .unwrap();

        let config = load_config_from_file(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 7777); // env wins over file
        assert_eq!(config.server.host, "0.0.0.0"); // file wins over default

        env::remove_var("TVM_SERVER_PORT");
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load_config_from_file("/nonexistent/file.yaml");
        assert!(result.is_err());
    }
}
