//! ABOUTME: Observability services including health checks and metrics
//! ABOUTME: Provides /health, /livez, /readyz and /metrics plus request instrumentation

pub mod health;
pub mod middleware;
pub mod registry;

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tl_core::{ReplicaIdentity, ServiceKind};

pub use health::{Dependency, HealthReport, HealthReporter, HealthStatus};
pub use middleware::{Instrumentation, POD_NAME_HEADER, SERVICE_VERSION_HEADER};
pub use registry::{route_label, ObsRegistry, UNMATCHED_ROUTE};

/// Readiness gate for controlling service readiness.
/// Flipped to not-ready when shutdown begins so that load balancers drain the replica.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Observability state shared across workers
#[derive(Debug, Clone)]
pub struct ObsState {
    pub kind: ServiceKind,
    pub identity: ReplicaIdentity,
    pub registry: Arc<ObsRegistry>,
    pub health: HealthReporter,
    pub readiness: ReadinessGate,
}

impl ObsState {
    pub fn new(
        registry: Arc<ObsRegistry>,
        identity: ReplicaIdentity,
        health: HealthReporter,
    ) -> Self {
        Self {
            kind: registry.kind(),
            identity,
            registry,
            health,
            readiness: ReadinessGate::new(),
        }
    }

    /// Middleware instance bound to this state's registry and identity
    pub fn instrumentation(&self) -> Instrumentation {
        Instrumentation::new(self.registry.clone(), &self.identity)
    }
}

/// Health endpoint handler: 200 when the dependency answers, 503 otherwise
async fn health(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    let status = state.health.check().await;
    let report = HealthReport::new(state.kind, &state.identity, &status);

    if status.is_healthy() {
        Ok(HttpResponse::Ok().json(report))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(report))
    }
}

/// Liveness only says the process is serving; it never touches the database
async fn liveness(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "alive",
        "pod_name": state.identity.pod_name,
    })))
}

/// Readiness endpoint handler
async fn readiness(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    if !state.readiness.is_ready() {
        tracing::info!("Readiness check while draining");
        return Ok(HttpResponse::ServiceUnavailable().json(json!({
            "status": "not ready",
            "reason": "shutting down",
        })));
    }

    match state.health.check().await {
        HealthStatus::Healthy => Ok(HttpResponse::Ok().json(json!({
            "status": "ready"
        }))),
        HealthStatus::Unhealthy { reason } => Ok(HttpResponse::ServiceUnavailable().json(json!({
            "status": "not ready",
            "reason": reason,
        }))),
    }
}

/// Metrics endpoint handler
async fn metrics(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    tracing::debug!("Metrics scrape requested");
    state.health.dependency().refresh_metrics();

    match state.registry.encode() {
        Ok(metrics_text) => Ok(HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4; charset=utf-8")
            .body(metrics_text)),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to encode metrics"
            })))
        }
    }
}

/// Mount the observability routes. Expects `web::Data<ObsState>` in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/livez", web::get().to(liveness))
        .route("/readyz", web::get().to(readiness))
        .route("/metrics", web::get().to(metrics));
}
