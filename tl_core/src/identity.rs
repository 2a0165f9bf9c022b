//! Replica identity attached to every response header and payload

use serde::Serialize;

/// Stable name of the serving replica plus the version it runs.
/// Resolved once at start-up and immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaIdentity {
    pub pod_name: String,
    pub version: String,
}

impl ReplicaIdentity {
    pub fn new(pod_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            pod_name: pod_name.into(),
            version: version.into(),
        }
    }

    /// Resolve the pod name from an explicit override, then `HOSTNAME`
    /// (set by container runtimes), then the OS hostname.
    pub fn resolve(pod_name: Option<&str>, version: &str) -> Self {
        let pod_name = pod_name
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()))
            .or_else(|| {
                hostname::get()
                    .ok()
                    .and_then(|h| h.into_string().ok())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Self::new(pod_name, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_pod_name_wins() {
        let identity = ReplicaIdentity::resolve(Some("inventory-7f9c"), "v2.0.0");
        assert_eq!(identity.pod_name, "inventory-7f9c");
        assert_eq!(identity.version, "v2.0.0");
    }

    #[test]
    fn test_falls_back_to_host() {
        let identity = ReplicaIdentity::resolve(Some(""), "v1.0.0");
        assert!(!identity.pod_name.is_empty());
    }
}
