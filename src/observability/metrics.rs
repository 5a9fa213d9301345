//! Prometheus metrics for the vending machine and its HTTP surface.
//!
//! Mirrors the teacher's `observability::metrics` shape (a thin
//! `MetricsRecorder` plus a global-recorder accessor pair) trimmed to the
//! counters/gauges this crate actually emits. The hot paths in
//! [`crate::vending::machine`] call the `metrics` macros directly rather
//! than going through `MetricsRecorder` — this module owns registration
//! (so the series exist at zero before the first event) and the few
//! metrics recorded outside `VendingMachine` (HTTP, database).

use std::net::SocketAddr;
use std::sync::Arc;

use ::tracing::{info, warn};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::RwLock;

use crate::config::ObservabilityConfig;
use crate::errors::{Result, TvmError};

/// Thin wrapper around the `metrics` macros for the call sites outside
/// `VendingMachine` (the HTTP layer, the database pool).
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: f64) {
        counter!("tvm_http_requests_total").increment(1);
        histogram!("tvm_http_request_duration_seconds").record(duration);

        let request_labels = [("method", method.to_string()), ("path", path.to_string())];
        counter!("tvm_http_requests_total", &request_labels).increment(1);

        let status_labels = [("status", status.to_string())];
        counter!("tvm_http_responses_total", &status_labels).increment(1);
    }

    pub fn record_db_query(&self, operation: &str, table: &str, duration: f64, success: bool) {
        let labels = [("operation", operation.to_string()), ("table", table.to_string())];
        counter!("tvm_db_queries_total", &labels).increment(1);

        let status = if success { "success" } else { "error" };
        let status_labels = [("operation", operation.to_string()), ("status", status.to_string())];
        counter!("tvm_db_queries_total", &status_labels).increment(1);

        let duration_labels = [("operation", operation.to_string())];
        histogram!("tvm_db_query_duration_seconds", &duration_labels).record(duration);
    }

    pub fn update_db_connections(&self, active: u32) {
        gauge!("tvm_db_connections_active").set(active as f64);
    }

    pub fn update_active_tokens(&self, count: u64) {
        gauge!("tvm_tokens_active").set(count as f64);
    }

    pub fn update_uptime(&self, uptime_seconds: f64) {
        gauge!("tvm_uptime_seconds").set(uptime_seconds);
    }

    /// Register the baseline series so they show up in `/metrics` at zero
    /// before the first `Exchange`/`Verify` call, rather than only
    /// appearing once something happens.
    pub fn register_baseline_metrics(&self) {
        describe_counter!("tvm_tokens_issued_total", Unit::Count, "Login tokens issued by Exchange");
        describe_counter!("tvm_tokens_revoked_total", Unit::Count, "Tokens revoked by name via Revoke");
        describe_counter!(
            "tvm_tokens_invalidated_total",
            Unit::Count,
            "Tokens invalidated as a side effect of UpdateMemberRoles"
        );
        describe_counter!("tvm_verify_total", Unit::Count, "Verify calls grouped by outcome");
        describe_gauge!("tvm_tokens_active", Unit::Count, "Currently unexpired tokens in the store");
        describe_counter!("tvm_http_requests_total", Unit::Count, "HTTP requests received");
        describe_histogram!(
            "tvm_http_request_duration_seconds",
            Unit::Seconds,
            "HTTP request handling duration"
        );
        describe_counter!("tvm_db_queries_total", Unit::Count, "Database queries executed");
        describe_histogram!("tvm_db_query_duration_seconds", Unit::Seconds, "Database query duration");
        describe_gauge!("tvm_db_connections_active", Unit::Count, "Active database pool connections");
        describe_gauge!("tvm_uptime_seconds", Unit::Seconds, "Process uptime");

        counter!("tvm_tokens_issued_total").absolute(0);
        counter!("tvm_tokens_revoked_total").absolute(0);
        counter!("tvm_tokens_invalidated_total").absolute(0);
        counter!("tvm_verify_total", "outcome" => "granted").absolute(0);
        counter!("tvm_verify_total", "outcome" => "denied").absolute(0);
    }
}

static METRICS: once_cell::sync::Lazy<Arc<RwLock<Option<MetricsRecorder>>>> =
    once_cell::sync::Lazy::new(|| Arc::new(RwLock::new(None)));

/// Initialize the Prometheus exporter and register baseline metrics.
/// A no-op when `ObservabilityConfig::enable_metrics` is false or no bind
/// address is configured.
pub async fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr
        .parse()
        .map_err(|e| TvmError::config(format!("invalid metrics bind address '{metrics_addr}': {e}")))?;

    let builder =
        PrometheusBuilder::new().with_http_listener(socket_addr).add_global_label("service", &config.service_name);

    builder.install().map_err(|e| TvmError::config(format!("failed to initialize metrics exporter: {e}")))?;

    let recorder = MetricsRecorder::new();
    {
        let mut metrics = METRICS.write().await;
        *metrics = Some(recorder.clone());
    }
    recorder.register_baseline_metrics();

    info!(metrics_addr = %metrics_addr, service_name = %config.service_name, "metrics collection initialized");

    Ok(())
}

pub async fn get_metrics() -> Option<MetricsRecorder> {
    METRICS.read().await.clone()
}

pub async fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_http_request(method, path, status, duration);
    }
}

pub async fn record_db_operation(operation: &str, table: &str, duration: f64, success: bool) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_db_query(operation, table, duration, success);
    }
}

pub async fn update_active_tokens(count: u64) {
    if let Some(metrics) = get_metrics().await {
        metrics.update_active_tokens(count);
    }
}

/// Periodically updates process-level gauges (uptime). Spawned once at
/// startup; runs for the process lifetime.
pub struct SystemMetricsCollector {
    start_time: std::time::Instant,
}

impl Default for SystemMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetricsCollector {
    pub fn new() -> Self {
        Self { start_time: std::time::Instant::now() }
    }

    pub async fn start(&self, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Some(metrics) = get_metrics().await {
                metrics.update_uptime(self.start_time.elapsed().as_secs_f64());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recorder_creation() {
        let recorder = MetricsRecorder::new();
        recorder.record_http_request("GET", "/v1/verify", 200, 0.002);
        recorder.record_db_query("SELECT", "tokens", 0.001, true);
        recorder.update_db_connections(3);
        recorder.update_active_tokens(7);
        recorder.update_uptime(120.0);
    }

    #[tokio::test]
    async fn test_init_metrics_disabled() {
        let config = ObservabilityConfig { enable_metrics: false, ..Default::default() };
        assert!(init_metrics(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_init_metrics_no_port() {
        let config = ObservabilityConfig { enable_metrics: true, metrics_port: 0, ..Default::default() };
        assert!(init_metrics(&config).await.is_ok());
    }
}
