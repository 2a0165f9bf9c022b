//! ABOUTME: Web API layer for the inventory, order, and user services
//! ABOUTME: Assembles routes, observability, and OpenAPI documentation into one app

use actix_web::{middleware::Logger, web, App, HttpRequest, HttpResponse};
use std::sync::Arc;
use std::time::Duration;
use tl_core::{ReplicaIdentity, ServiceKind};
use tl_db::Db;
use tl_obs::{HealthReporter, ObsRegistry, ObsState};
use utoipa::OpenApi;

pub mod error;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use metrics::DomainMetrics;
pub use server::{serve, serve_listener, shutdown_signal};

use routes::{inventory, orders, users};

/// Application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Db,
    pub identity: ReplicaIdentity,
    pub metrics: DomainMetrics,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        inventory::list_inventory,
        inventory::get_product,
        inventory::update_inventory,
        inventory::check_inventory,
        orders::list_orders,
        orders::get_order,
        orders::create_order,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::UpdateInventoryRequest,
            models::InventoryCheckRequest,
            models::CreateOrderBody,
            models::CreateUserBody,
            models::UpdateUserBody,
            models::InventoryListResponse,
            models::ProductResponse,
            models::AvailabilityResponse,
            models::OrderListResponse,
            models::OrderResponse,
            models::UserListResponse,
            models::UserResponse,
            models::MessageResponse,
            tl_db::InventoryItem,
            tl_db::Availability,
            tl_db::Order,
            tl_db::User,
        ),
    ),
    tags(
        (name = "inventory", description = "Stock levels and availability"),
        (name = "orders", description = "Order placement"),
        (name = "users", description = "User profiles"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Document only the paths served by `kind`
    pub fn for_kind(kind: ServiceKind) -> utoipa::openapi::OpenApi {
        let prefix = match kind {
            ServiceKind::Inventory => "/inventory",
            ServiceKind::Order => "/orders",
            ServiceKind::User => "/users",
        };
        let mut doc = Self::openapi();
        doc.paths.paths.retain(|path, _| path.starts_with(prefix));
        doc
    }
}

/// Everything one replica needs to serve: domain state plus observability
#[derive(Debug, Clone)]
pub struct ServiceInstance {
    pub state: AppState,
    pub obs: ObsState,
}

impl ServiceInstance {
    /// Wire the registry, pool metrics, domain metrics and health reporter
    /// around an already initialized `db`.
    pub fn new(
        kind: ServiceKind,
        db: Db,
        identity: ReplicaIdentity,
        health_timeout: Duration,
    ) -> Self {
        let metrics = DomainMetrics::new();

        let mut registry = ObsRegistry::new(kind);
        db.metrics().register(registry.registry_mut());
        metrics.register(kind, registry.registry_mut());

        let health = HealthReporter::new(Arc::new(db.clone()), health_timeout);
        let obs = ObsState::new(Arc::new(registry), identity.clone(), health);

        Self {
            state: AppState {
                db,
                identity,
                metrics,
            },
            obs,
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.obs.kind
    }

    /// Build the actix application for this replica
    pub fn app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        create_app(self.state.clone(), self.obs.clone())
    }
}

/// Create the main web application service factory.
///
/// Instrumentation is the outermost layer so that every response, including
/// default-service 404s and extractor failures, is counted and stamped.
pub fn create_app(
    state: AppState,
    obs: ObsState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let kind = obs.kind;
    let instrumentation = obs.instrumentation();

    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::Data::new(obs))
        .app_data(json_config())
        .wrap(Logger::default())
        .wrap(instrumentation)
        .configure(tl_obs::configure)
        .route(
            "/api-docs/openapi.json",
            web::get().to(move || async move { HttpResponse::Ok().json(ApiDoc::for_kind(kind)) }),
        )
        .configure(move |cfg| routes::configure(kind, cfg))
        .default_service(web::route().to(not_found))
}

/// Malformed or mistyped JSON bodies are client errors with a fixed message
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            tracing::debug!("Rejected request body: {}", err);
            ApiError::bad_request("Invalid input").into()
        })
}

async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "Not found",
        "path": req.path(),
    }))
}
