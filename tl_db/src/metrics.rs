//! ABOUTME: Database connection pool metrics
//! ABOUTME: Provides Prometheus metrics for database pool performance monitoring

use prometheus_client::metrics::{counter::Counter, gauge::Gauge};
use prometheus_client::registry::Registry;

/// Metrics for database connection pool operations
#[derive(Debug, Clone, Default)]
pub struct PoolMetrics {
    /// Total number of successful connection acquisitions
    pub connections_acquired: Counter,
    /// Total number of acquisitions that failed for reasons other than timeout
    pub connections_failed: Counter,
    /// Total number of connection acquisition timeouts
    pub connections_timeout: Counter,
    /// Current number of idle connections in pool
    pub connections_idle: Gauge,
    /// Current number of checked-out connections
    pub connections_active: Gauge,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach every pool metric to `registry`
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "db_pool_connections_active",
            "Connections currently checked out of the pool",
            self.connections_active.clone(),
        );
        registry.register(
            "db_pool_connections_idle",
            "Idle connections held by the pool",
            self.connections_idle.clone(),
        );
        registry.register(
            "db_pool_acquire_timeouts",
            "Acquisitions that exceeded the acquire timeout",
            self.connections_timeout.clone(),
        );
        registry.register(
            "db_pool_acquire_failures",
            "Acquisitions that failed to open a connection",
            self.connections_failed.clone(),
        );
        registry.register(
            "db_pool_acquisitions",
            "Successful connection acquisitions",
            self.connections_acquired.clone(),
        );
    }

    pub fn record_acquired(&self) {
        self.connections_acquired.inc();
    }

    pub fn record_failed(&self) {
        self.connections_failed.inc();
    }

    pub fn record_timeout(&self) {
        self.connections_timeout.inc();
    }

    /// Update both gauges from a pool snapshot (`size` includes idle connections)
    pub fn set_pool_state(&self, size: u32, idle: usize) {
        let idle = idle as i64;
        let active = (size as i64 - idle).max(0);
        self.connections_idle.set(idle);
        self.connections_active.set(active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn test_pool_state_gauges() {
        let metrics = PoolMetrics::new();
        metrics.set_pool_state(5, 2);
        assert_eq!(metrics.connections_active.get(), 3);
        assert_eq!(metrics.connections_idle.get(), 2);

        // a racing snapshot may report more idle than total
        metrics.set_pool_state(1, 2);
        assert_eq!(metrics.connections_active.get(), 0);
    }

    #[test]
    fn test_registered_names() {
        let metrics = PoolMetrics::new();
        let mut registry = Registry::with_prefix("inventory_service");
        metrics.register(&mut registry);
        metrics.record_timeout();

        let mut out = String::new();
        encode(&mut out, &registry).unwrap();
        assert!(out.contains("inventory_service_db_pool_connections_active"));
        assert!(out.contains("inventory_service_db_pool_acquire_timeouts_total 1"));
        assert!(out.contains("inventory_service_db_pool_acquisitions_total 0"));
    }
}
