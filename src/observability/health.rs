//! Health checking for the TVM service's dependencies (presently: the
//! database). Grounded on the teacher's `observability::health`: the same
//! provider-registry/cache shape, with the xDS/control-plane-specific
//! providers dropped — TVM has one dependency worth checking.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded { message: String },
    Unhealthy { message: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            HealthStatus::Healthy => None,
            HealthStatus::Degraded { message } | HealthStatus::Unhealthy { message } => Some(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub last_check: chrono::DateTime<chrono::Utc>,
    pub metadata: HashMap<String, String>,
}

impl HealthCheck {
    pub fn new(component: String, status: HealthStatus) -> Self {
        Self { component, status, last_check: chrono::Utc::now(), metadata: HashMap::new() }
    }

    pub fn healthy(component: String) -> Self {
        Self::new(component, HealthStatus::Healthy)
    }

    pub fn degraded<S: Into<String>>(component: String, message: S) -> Self {
        Self::new(component, HealthStatus::Degraded { message: message.into() })
    }

    pub fn unhealthy<S: Into<String>>(component: String, message: S) -> Self {
        Self::new(component, HealthStatus::Unhealthy { message: message.into() })
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[async_trait::async_trait]
pub trait HealthProvider {
    async fn health_check(&self) -> Result<HealthCheck>;
}

/// Registry of health providers plus a cache of the last check performed
/// on each, behind its own `/healthz` readiness/liveness endpoints in the
/// `api` layer.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    providers: Arc<RwLock<HashMap<String, Box<dyn HealthProvider + Send + Sync>>>>,
    cache: Arc<RwLock<HashMap<String, HealthCheck>>>,
    instance_id: String,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            cache: Arc::new(RwLock::new(HashMap::new())),
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn register_provider<S: Into<String>>(
        &self,
        name: S,
        provider: Box<dyn HealthProvider + Send + Sync>,
    ) {
        self.providers.write().await.insert(name.into(), provider);
    }

    pub async fn check_all(&self) -> Result<HashMap<String, HealthCheck>> {
        let providers = self.providers.read().await;
        let mut results = HashMap::new();

        for (name, provider) in providers.iter() {
            let check = match provider.health_check().await {
                Ok(check) => check,
                Err(e) => HealthCheck::unhealthy(name.clone(), format!("health check failed: {e}")),
            };
            results.insert(name.clone(), check);
        }

        let mut cache = self.cache.write().await;
        cache.extend(results.clone());

        Ok(results)
    }

    pub async fn overall_status(&self) -> HealthStatus {
        let checks = match self.check_all().await {
            Ok(checks) => checks,
            Err(e) => return HealthStatus::Unhealthy { message: format!("failed to perform health checks: {e}") },
        };

        if checks.is_empty() {
            return HealthStatus::Degraded { message: "no health providers registered".to_string() };
        }

        let mut unhealthy_count = 0;
        let mut degraded_count = 0;

        for check in checks.values() {
            match &check.status {
                HealthStatus::Healthy => {}
                HealthStatus::Degraded { .. } => degraded_count += 1,
                HealthStatus::Unhealthy { .. } => unhealthy_count += 1,
            }
        }

        if unhealthy_count > 0 {
            HealthStatus::Unhealthy {
                message: format!("{unhealthy_count} unhealthy, {degraded_count} degraded out of {} components", checks.len()),
            }
        } else if degraded_count > 0 {
            HealthStatus::Degraded { message: format!("{degraded_count} degraded out of {} components", checks.len()) }
        } else {
            HealthStatus::Healthy
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.overall_status().await.is_operational()
    }

    pub async fn is_alive(&self) -> bool {
        true
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub async fn get_cached_checks(&self) -> HashMap<String, HealthCheck> {
        self.cache.read().await.clone()
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks the one dependency TVM has: its SQLite pool.
pub struct DatabaseHealthProvider {
    db_pool: crate::storage::DbPool,
}

impl DatabaseHealthProvider {
    pub fn new(db_pool: crate::storage::DbPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait::async_trait]
impl HealthProvider for DatabaseHealthProvider {
    async fn health_check(&self) -> Result<HealthCheck> {
        let start = std::time::Instant::now();

        match sqlx::query("SELECT 1").fetch_one(&self.db_pool).await {
            Ok(_) => {
                let duration = start.elapsed();
                Ok(HealthCheck::healthy("database".to_string())
                    .with_metadata("response_time_ms", duration.as_millis().to_string())
                    .with_metadata("active_connections", self.db_pool.size().to_string()))
            }
            Err(e) => Ok(HealthCheck::unhealthy("database".to_string(), format!("database connection failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(HealthStatus::Healthy.is_operational());
        assert!(HealthStatus::Healthy.message().is_none());

        let degraded = HealthStatus::Degraded { message: "slow".to_string() };
        assert!(!degraded.is_healthy());
        assert!(degraded.is_operational());
        assert_eq!(degraded.message(), Some("slow"));

        let unhealthy = HealthStatus::Unhealthy { message: "down".to_string() };
        assert!(!unhealthy.is_healthy());
        assert!(!unhealthy.is_operational());
        assert_eq!(unhealthy.message(), Some("down"));
    }

    #[test]
    fn test_health_check_creation() {
        let check = HealthCheck::healthy("test".to_string());
        assert_eq!(check.component, "test");
        assert!(check.status.is_healthy());
    }

    #[tokio::test]
    async fn test_health_checker_with_no_providers() {
        let health_checker = HealthChecker::new();

        let status = health_checker.overall_status().await;
        assert!(matches!(status, HealthStatus::Degraded { .. }));

        assert!(health_checker.is_alive().await);
        assert!(!health_checker.is_ready().await);
        assert!(health_checker.get_cached_checks().await.is_empty());
    }

    struct MockHealthProvider {
        status: HealthStatus,
    }

    #[async_trait::async_trait]
    impl HealthProvider for MockHealthProvider {
        async fn health_check(&self) -> Result<HealthCheck> {
            Ok(HealthCheck::new("mock".to_string(), self.status.clone()))
        }
    }

    #[tokio::test]
    async fn test_health_checker_aggregates_provider_statuses() {
        let health_checker = HealthChecker::new();

        health_checker
            .register_provider("service1", Box::new(MockHealthProvider { status: HealthStatus::Healthy }))
            .await;
        health_checker
            .register_provider(
                "service2",
                Box::new(MockHealthProvider { status: HealthStatus::Degraded { message: "slow".to_string() } }),
            )
            .await;

        let status = health_checker.overall_status().await;
        assert!(matches!(status, HealthStatus::Degraded { .. }));
        assert!(health_checker.is_ready().await);

        health_checker
            .register_provider(
                "service3",
                Box::new(MockHealthProvider { status: HealthStatus::Unhealthy { message: "down".to_string() } }),
            )
            .await;

        let status = health_checker.overall_status().await;
        assert!(matches!(status, HealthStatus::Unhealthy { .. }));
        assert!(!health_checker.is_ready().await);
    }

    #[tokio::test]
    async fn database_health_provider_reports_healthy_against_a_live_pool() {
        let db = crate::storage::test_helpers::TestDatabase::new().await;
        let provider = DatabaseHealthProvider::new(db.pool.clone());

        let check = provider.health_check().await.unwrap();
        assert!(check.status.is_healthy());
    }
}
