//! ABOUTME: Binary health reporting driven by a live dependency check
//! ABOUTME: Every check performs a fresh round trip; nothing is cached

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tl_core::{unix_timestamp, MonotonicTimer, ReplicaIdentity, Result, ServiceKind};
use tracing::{debug, warn};

/// A backing dependency that can be checked with a trivial round trip
#[async_trait]
pub trait Dependency: Send + Sync {
    /// Name reported in logs
    fn name(&self) -> &str;

    /// Acquire, run a trivial query, release
    async fn ping(&self) -> Result<()>;

    /// Refresh any gauges derived from the dependency before a scrape
    fn refresh_metrics(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy { reason: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy { .. } => "unhealthy",
        }
    }
}

/// JSON body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: String,
    pub pod_name: String,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: u64,
}

impl HealthReport {
    pub fn new(kind: ServiceKind, identity: &ReplicaIdentity, status: &HealthStatus) -> Self {
        let error = match status {
            HealthStatus::Healthy => None,
            HealthStatus::Unhealthy { reason } => Some(reason.clone()),
        };

        Self {
            status: status.as_str(),
            service: kind.service_name(),
            version: identity.version.clone(),
            pod_name: identity.pod_name.clone(),
            database: status.as_str(),
            error,
            timestamp: unix_timestamp(),
        }
    }
}

/// Answers health checks by actively pinging the dependency within a bound
#[derive(Clone)]
pub struct HealthReporter {
    dependency: Arc<dyn Dependency>,
    timeout: Duration,
}

impl fmt::Debug for HealthReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthReporter")
            .field("dependency", &self.dependency.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HealthReporter {
    pub fn new(dependency: Arc<dyn Dependency>, timeout: Duration) -> Self {
        Self {
            dependency,
            timeout,
        }
    }

    pub fn dependency(&self) -> &Arc<dyn Dependency> {
        &self.dependency
    }

    /// Ping the dependency. Timeouts, refused connections and query errors
    /// all map to `Unhealthy` with the captured reason.
    pub async fn check(&self) -> HealthStatus {
        let timer = MonotonicTimer::new();
        let name = self.dependency.name();

        let status = match tokio::time::timeout(self.timeout, self.dependency.ping()).await {
            Ok(Ok(())) => HealthStatus::Healthy,
            Ok(Err(e)) => HealthStatus::Unhealthy {
                reason: e.to_string(),
            },
            Err(_) => HealthStatus::Unhealthy {
                reason: format!(
                    "{} check timed out after {}ms",
                    name,
                    self.timeout.as_millis()
                ),
            },
        };

        match &status {
            HealthStatus::Healthy => debug!(
                dependency = name,
                elapsed_ms = timer.elapsed().as_millis() as u64,
                "Dependency check succeeded"
            ),
            HealthStatus::Unhealthy { reason } => warn!(
                dependency = name,
                elapsed_ms = timer.elapsed().as_millis() as u64,
                reason = %reason,
                "Dependency check failed"
            ),
        }

        status
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use tl_core::Error;

    /// Scriptable dependency for health tests
    #[derive(Debug, Default)]
    pub(crate) struct FakeDependency {
        pub failing: AtomicBool,
        pub delay: Option<Duration>,
        pub pings: AtomicU32,
    }

    impl FakeDependency {
        pub(crate) fn healthy() -> Self {
            Self::default()
        }

        pub(crate) fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Dependency for FakeDependency {
        fn name(&self) -> &str {
            "database"
        }

        async fn ping(&self) -> Result<()> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::Database("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_healthy_dependency() {
        let dependency = Arc::new(FakeDependency::healthy());
        let reporter = HealthReporter::new(dependency.clone(), Duration::from_secs(1));

        assert_eq!(reporter.check().await, HealthStatus::Healthy);
        assert_eq!(dependency.pings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_carries_reason() {
        let dependency = Arc::new(FakeDependency::healthy());
        dependency.failing.store(true, Ordering::SeqCst);
        let reporter = HealthReporter::new(dependency, Duration::from_secs(1));

        match reporter.check().await {
            HealthStatus::Unhealthy { reason } => assert!(reason.contains("connection refused")),
            other => panic!("expected unhealthy, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_unhealthy() {
        let dependency = Arc::new(FakeDependency::slow(Duration::from_millis(200)));
        let reporter = HealthReporter::new(dependency, Duration::from_millis(20));

        match reporter.check().await {
            HealthStatus::Unhealthy { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected unhealthy, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_checks_are_never_cached() {
        let dependency = Arc::new(FakeDependency::healthy());
        let reporter = HealthReporter::new(dependency.clone(), Duration::from_secs(1));

        assert!(reporter.check().await.is_healthy());
        dependency.failing.store(true, Ordering::SeqCst);
        assert!(!reporter.check().await.is_healthy());
        dependency.failing.store(false, Ordering::SeqCst);
        assert!(reporter.check().await.is_healthy());
        assert_eq!(dependency.pings.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_report_shape() {
        let identity = ReplicaIdentity::new("inventory-0", "v1.0.0");
        let report = HealthReport::new(
            ServiceKind::Inventory,
            &identity,
            &HealthStatus::Unhealthy {
                reason: "down".to_string(),
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["service"], "inventory-service");
        assert_eq!(json["database"], "unhealthy");
        assert_eq!(json["error"], "down");
        assert_eq!(json["pod_name"], "inventory-0");
    }
}
