//! Structured logging setup, via `tracing` + `tracing-subscriber`.
//!
//! TVM carries no distributed-tracing/OTLP layer (out of scope) — just the
//! `fmt` subscriber, pretty for local development or JSON for production
//! log shipping, filtered by `ObservabilityConfig::log_level`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;
use crate::errors::{Result, TvmError};

/// Initialize the global `tracing` subscriber. Call once, at process startup.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = parse_env_filter(&config.log_level)?;

    if config.json_logging {
        let json_layer = tracing_subscriber::fmt::layer().json().flatten_event(true).with_current_span(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TvmError::config(format!("failed to initialize logging: {e}")))?;
    } else {
        let pretty_layer =
            tracing_subscriber::fmt::layer().pretty().with_target(true).with_thread_ids(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(pretty_layer)
            .try_init()
            .map_err(|e| TvmError::config(format!("failed to initialize logging: {e}")))?;
    }

    Ok(())
}

fn parse_env_filter(level: &str) -> Result<EnvFilter> {
    let normalized = level.trim();
    let lower = normalized.to_ascii_lowercase();

    match lower.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => {
            return Err(TvmError::config(format!(
                "invalid log level '{level}': must be one of trace, debug, info, warn, error"
            )));
        }
    }

    EnvFilter::try_new(normalized).map_err(|e| TvmError::config(format!("invalid log level '{level}': {e}")))
}

/// Log the resolved configuration at startup, minus anything secret.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        server_address = %config.server.bind_address(),
        database_url = %config.database.url,
        metrics_enabled = %config.observability.enable_metrics,
        login_token_duration_seconds = config.auth.login_token_duration_seconds,
        max_token_duration_seconds = config.auth.max_token_duration_seconds,
        "tvm configuration loaded"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_info() {
        let config = crate::config::AppConfig::default();
        log_config_info(&config);
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(parse_env_filter("verbose").is_err());
    }

    #[test]
    fn accepts_known_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(parse_env_filter(level).is_ok());
        }
    }
}
