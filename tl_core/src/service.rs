//! The three service flavours a tierlab instance can run as

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Inventory,
    Order,
    User,
}

impl ServiceKind {
    /// Service name reported in health payloads and logs
    pub fn service_name(self) -> &'static str {
        match self {
            ServiceKind::Inventory => "inventory-service",
            ServiceKind::Order => "order-service",
            ServiceKind::User => "user-service",
        }
    }

    /// Prefix applied to every metric this service exports
    pub fn metric_prefix(self) -> &'static str {
        match self {
            ServiceKind::Inventory => "inventory_service",
            ServiceKind::Order => "order_service",
            ServiceKind::User => "user_service",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            ServiceKind::Inventory => 3000,
            ServiceKind::Order => 8080,
            ServiceKind::User => 8000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Inventory => "inventory",
            ServiceKind::Order => "order",
            ServiceKind::User => "user",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inventory" | "inventory-service" => Ok(ServiceKind::Inventory),
            "order" | "orders" | "order-service" => Ok(ServiceKind::Order),
            "user" | "users" | "user-service" => Ok(ServiceKind::User),
            other => Err(Error::Config(format!("Unknown service kind: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_service_names() {
        assert_eq!("inventory".parse::<ServiceKind>().unwrap(), ServiceKind::Inventory);
        assert_eq!("Order-Service".parse::<ServiceKind>().unwrap(), ServiceKind::Order);
        assert_eq!("users".parse::<ServiceKind>().unwrap(), ServiceKind::User);
        assert!("gateway".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn test_default_ports_match_deployment() {
        assert_eq!(ServiceKind::Inventory.default_port(), 3000);
        assert_eq!(ServiceKind::Order.default_port(), 8080);
        assert_eq!(ServiceKind::User.default_port(), 8000);
    }
}
