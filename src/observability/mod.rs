//! Observability: structured logging, Prometheus metrics, and health
//! checking for the TVM service. No distributed tracing/OTLP layer — the
//! teacher's `tracing.rs`/`grpc_tracing.rs`/`http_tracing.rs` exist to
//! bridge Envoy xDS streams and gRPC services to Jaeger/Zipkin, which TVM
//! has no analogue of; logging still runs through the same
//! `tracing`/`tracing-subscriber` stack, just without the OpenTelemetry
//! bridge layer.

pub mod health;
pub mod logging;
pub mod metrics;

pub use health::{HealthChecker, HealthStatus};
pub use logging::log_config_info;
pub use metrics::{init_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use tracing::info;

/// Initializes logging and (if enabled) the Prometheus exporter, and
/// returns a [`HealthChecker`] ready for callers to register providers
/// against (the `api` layer registers [`health::DatabaseHealthProvider`]).
pub async fn init_observability(config: &ObservabilityConfig) -> Result<HealthChecker> {
    logging::init_logging(config)?;

    if config.enable_metrics {
        init_metrics(config).await?;
    }

    let health_checker = HealthChecker::new();

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        metrics_enabled = %config.enable_metrics,
        "observability initialized"
    );

    Ok(health_checker)
}
