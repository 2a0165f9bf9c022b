//! ABOUTME: Request instrumentation middleware for actix-web
//! ABOUTME: Records method, route template and status, stamps replica headers

use crate::registry::{route_label, ObsRegistry};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{HeaderMap, HeaderName, HeaderValue},
        StatusCode,
    },
    Error, HttpResponse, ResponseError,
};
use futures_util::future::{ready, FutureExt, LocalBoxFuture, Ready};
use serde_json::json;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::sync::Arc;
use tl_core::{MonotonicTimer, ReplicaIdentity};
use tracing::{debug, error};

pub const POD_NAME_HEADER: &str = "x-pod-name";
pub const SERVICE_VERSION_HEADER: &str = "x-service-version";

/// Identity headers computed once; values that are not valid header text are skipped
#[derive(Debug, Clone, Default)]
struct ReplicaHeaders {
    values: Vec<(HeaderName, HeaderValue)>,
}

impl ReplicaHeaders {
    fn new(identity: &ReplicaIdentity) -> Self {
        let values = [
            (POD_NAME_HEADER, identity.pod_name.as_str()),
            (SERVICE_VERSION_HEADER, identity.version.as_str()),
        ]
        .into_iter()
        .filter_map(|(name, value)| match HeaderValue::from_str(value) {
            Ok(value) => Some((HeaderName::from_static(name), value)),
            Err(_) => {
                error!(header = name, "Replica identity is not a valid header value");
                None
            }
        })
        .collect();

        Self { values }
    }

    fn stamp(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.values {
            headers.insert(name.clone(), value.clone());
        }
    }
}

/// Why the inner service produced no response of its own
#[derive(Debug)]
enum Failure {
    Service(Error),
    Panic,
}

/// Error surfaced to the server when the inner service failed or panicked.
/// Its rendered response still carries the replica headers.
#[derive(Debug)]
struct StampedFailure {
    failure: Failure,
    headers: Rc<ReplicaHeaders>,
}

impl fmt::Display for StampedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            Failure::Service(err) => write!(f, "{}", err),
            Failure::Panic => f.write_str("handler panicked"),
        }
    }
}

impl ResponseError for StampedFailure {
    fn status_code(&self) -> StatusCode {
        match &self.failure {
            Failure::Service(err) => err.as_response_error().status_code(),
            Failure::Panic => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = match &self.failure {
            Failure::Service(err) => err.error_response(),
            Failure::Panic => HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error",
                "kind": "panic"
            })),
        };
        self.headers.stamp(response.headers_mut());
        response
    }
}

/// Wraps every handler so that each finished request (success, handled
/// error, or panic) is counted exactly once under its route template.
#[derive(Clone)]
pub struct Instrumentation {
    registry: Arc<ObsRegistry>,
    headers: Rc<ReplicaHeaders>,
}

impl Instrumentation {
    pub fn new(registry: Arc<ObsRegistry>, identity: &ReplicaIdentity) -> Self {
        Self {
            registry,
            headers: Rc::new(ReplicaHeaders::new(identity)),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Instrumentation
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = InstrumentationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(InstrumentationMiddleware {
            service: Rc::new(service),
            registry: self.registry.clone(),
            headers: self.headers.clone(),
        }))
    }
}

pub struct InstrumentationMiddleware<S> {
    service: Rc<S>,
    registry: Arc<ObsRegistry>,
    headers: Rc<ReplicaHeaders>,
}

impl<S, B> Service<ServiceRequest> for InstrumentationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let registry = self.registry.clone();
        let headers = self.headers.clone();

        Box::pin(async move {
            let timer = MonotonicTimer::new();
            let method = req.method().as_str().to_string();
            let path = req.path().to_string();
            // resolved from the resource map, so it is known before routing runs
            let route = route_label(req.request().match_pattern().as_deref());

            let outcome = AssertUnwindSafe(service.call(req)).catch_unwind().await;

            let result = match outcome {
                Ok(Ok(mut res)) => {
                    headers.stamp(res.headers_mut());
                    Ok(res)
                }
                Ok(Err(err)) => Err(StampedFailure {
                    failure: Failure::Service(err),
                    headers: headers.clone(),
                }),
                Err(_) => {
                    error!(
                        method = %method,
                        path = %path,
                        "Handler panicked; responding with 500"
                    );
                    Err(StampedFailure {
                        failure: Failure::Panic,
                        headers: headers.clone(),
                    })
                }
            };

            let status = match &result {
                Ok(res) => res.status(),
                Err(failure) => failure.status_code(),
            };
            let elapsed = timer.elapsed_secs();
            registry.record_request(&method, &route, status.as_u16(), elapsed);

            debug!(
                method = %method,
                route = %route,
                status = status.as_u16(),
                duration_ms = (elapsed * 1000.0) as u64,
                "Request completed"
            );

            result.map_err(Error::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};
    use tl_core::ServiceKind;

    async fn ok_item(path: web::Path<String>) -> HttpResponse {
        HttpResponse::Ok().json(json!({ "id": path.into_inner() }))
    }

    async fn boom() -> HttpResponse {
        panic!("handler exploded");
    }

    fn instrumentation(registry: &Arc<ObsRegistry>) -> Instrumentation {
        Instrumentation::new(
            registry.clone(),
            &ReplicaIdentity::new("inventory-0", "v1.0.0"),
        )
    }

    #[actix_web::test]
    async fn test_headers_on_success_and_not_found() {
        let registry = Arc::new(ObsRegistry::new(ServiceKind::Inventory));
        let app = test::init_service(
            App::new()
                .wrap(instrumentation(&registry))
                .route("/inventory/{id}", web::get().to(ok_item)),
        )
        .await;

        for uri in ["/inventory/1", "/nowhere"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.headers().get(POD_NAME_HEADER).unwrap(), "inventory-0");
            assert_eq!(resp.headers().get(SERVICE_VERSION_HEADER).unwrap(), "v1.0.0");
        }
    }

    #[actix_web::test]
    async fn test_route_template_bounds_cardinality() {
        let registry = Arc::new(ObsRegistry::new(ServiceKind::Inventory));
        let app = test::init_service(
            App::new()
                .wrap(instrumentation(&registry))
                .route("/inventory/{id}", web::get().to(ok_item)),
        )
        .await;

        for uri in ["/inventory/1", "/inventory/2", "/inventory/abc"] {
            let _ = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        }

        let encoded = registry.encode().unwrap();
        assert!(encoded.contains(
            "inventory_service_http_requests_total{method=\"GET\",route=\"/inventory/:id\",status_code=\"200\"} 3"
        ));
        assert!(!encoded.contains("/inventory/abc"));
    }

    #[actix_web::test]
    async fn test_panic_becomes_counted_500() {
        let registry = Arc::new(ObsRegistry::new(ServiceKind::User));
        let app = test::init_service(
            App::new()
                .wrap(instrumentation(&registry))
                .route("/boom", web::get().to(boom)),
        )
        .await;

        let err = test::try_call_service(&app, test::TestRequest::get().uri("/boom").to_request())
            .await
            .unwrap_err();
        let resp = err.error_response();
        assert_eq!(resp.status(), 500);
        assert_eq!(resp.headers().get(POD_NAME_HEADER).unwrap(), "inventory-0");

        let encoded = registry.encode().unwrap();
        assert!(encoded.contains(
            "user_service_http_requests_total{method=\"GET\",route=\"/boom\",status_code=\"500\"} 1"
        ));
    }

    #[::core::prelude::v1::test]
    fn test_invalid_identity_header_is_skipped() {
        let headers = ReplicaHeaders::new(&ReplicaIdentity::new("bad\nname", "v1"));
        assert_eq!(headers.values.len(), 1);
        assert_eq!(headers.values[0].0.as_str(), SERVICE_VERSION_HEADER);
    }
}
