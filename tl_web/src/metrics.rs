//! ABOUTME: Business metrics owned by the domain routes
//! ABOUTME: Only the metric belonging to the running service kind is registered

use prometheus_client::metrics::{counter::Counter, gauge::Gauge};
use prometheus_client::registry::Registry;
use tl_core::ServiceKind;

#[derive(Debug, Clone, Default)]
pub struct DomainMetrics {
    /// Distinct products in stock, refreshed on every inventory listing
    pub items_total: Gauge,
    pub orders_created: Counter,
    pub users_created: Counter,
}

impl DomainMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: ServiceKind, registry: &mut Registry) {
        match kind {
            ServiceKind::Inventory => registry.register(
                "items_total",
                "Total number of items in inventory",
                self.items_total.clone(),
            ),
            ServiceKind::Order => registry.register(
                "orders_created",
                "Total number of orders created",
                self.orders_created.clone(),
            ),
            ServiceKind::User => registry.register(
                "users_created",
                "Total number of users created",
                self.users_created.clone(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn test_only_own_metric_is_exposed() {
        let metrics = DomainMetrics::new();
        let mut registry = Registry::with_prefix(ServiceKind::Order.metric_prefix());
        metrics.register(ServiceKind::Order, &mut registry);
        metrics.orders_created.inc();

        let mut out = String::new();
        encode(&mut out, &registry).unwrap();
        assert!(out.contains("order_service_orders_created_total 1"));
        assert!(!out.contains("users_created"));
        assert!(!out.contains("items_total"));
    }
}
