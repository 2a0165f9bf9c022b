//! ABOUTME: Process-owned observability registry for Prometheus exposition
//! ABOUTME: Request counters and latency histograms keyed by route template

use prometheus_client::{
    encoding::{text::encode, EncodeLabelSet},
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::Registry,
};
use tl_core::{Error, Result, ServiceKind};

/// Route label used when no route template matched (404s from the default service)
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Latency buckets in seconds
const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Labels of the request counter
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub method: String,
    pub route: String,
    pub status_code: String,
}

/// Labels of the latency histogram
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RouteLabels {
    pub method: String,
    pub route: String,
}

fn latency_histogram() -> Histogram {
    Histogram::new(LATENCY_BUCKETS.into_iter())
}

/// Single owned registry created at process start and shared with the
/// instrumentation middleware and the scrape handler.
///
/// Additional collectors (pool gauges, domain counters) are registered through
/// [`ObsRegistry::registry_mut`] before the registry is frozen behind an `Arc`.
#[derive(Debug)]
pub struct ObsRegistry {
    kind: ServiceKind,
    registry: Registry,
    http_requests: Family<RequestLabels, Counter>,
    http_request_duration: Family<RouteLabels, Histogram, fn() -> Histogram>,
}

impl ObsRegistry {
    pub fn new(kind: ServiceKind) -> Self {
        let mut registry = Registry::with_prefix(kind.metric_prefix());

        let http_requests = Family::<RequestLabels, Counter>::default();
        registry.register(
            "http_requests",
            "Total number of HTTP requests",
            http_requests.clone(),
        );

        let http_request_duration =
            Family::<RouteLabels, Histogram, fn() -> Histogram>::new_with_constructor(
                latency_histogram,
            );
        registry.register(
            "http_request_duration_seconds",
            "Duration of HTTP requests in seconds",
            http_request_duration.clone(),
        );

        Self {
            kind,
            registry,
            http_requests,
            http_request_duration,
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Registry for additional collectors; metric names get the service prefix
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Count one finished request and record its latency.
    /// `route` must already be a route template, never a concrete path.
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        self.http_requests
            .get_or_create(&RequestLabels {
                method: method.to_string(),
                route: route.to_string(),
                status_code: status.to_string(),
            })
            .inc();

        self.http_request_duration
            .get_or_create(&RouteLabels {
                method: method.to_string(),
                route: route.to_string(),
            })
            .observe(duration_secs);
    }

    /// Render every registered metric in the text exposition format
    pub fn encode(&self) -> Result<String> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)
            .map_err(|e| Error::Metrics(format!("Failed to encode metrics: {}", e)))?;
        Ok(buffer)
    }
}

/// Convert an actix match pattern (`/inventory/{id}`) into the label form
/// (`/inventory/:id`). Requests without a matched pattern share one label.
pub fn route_label(pattern: Option<&str>) -> String {
    let Some(pattern) = pattern else {
        return UNMATCHED_ROUTE.to_string();
    };

    let mut label = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '{' {
            label.push(c);
            continue;
        }
        // `{name}` or `{name:regex}` -> `:name`
        let inner: String = chars.by_ref().take_while(|&c| c != '}').collect();
        let name = inner.split(':').next().unwrap_or_default();
        label.push(':');
        label.push_str(name);
    }

    if label.is_empty() {
        "/".to_string()
    } else {
        label
    }
}
