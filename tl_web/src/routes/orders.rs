//! ABOUTME: Order endpoints for placing and reading orders
//! ABOUTME: Orders are created pending; no cross-service reservation happens here

use crate::{
    error::{ApiError, ResultExt},
    models::{CreateOrderBody, OrderListResponse, OrderResponse},
    AppState,
};
use actix_web::{get, post, web, HttpResponse, Result};
use tl_db::{CreateOrderRequest, OrderRepository};
use tracing::info;
use validator::Validate;

/// List the most recent orders
#[utoipa::path(
    get,
    path = "/orders",
    tag = "orders",
    responses(
        (status = 200, description = "Latest orders, newest first", body = OrderListResponse),
        (status = 500, description = "Store failure", body = crate::models::ErrorResponse),
    )
)]
#[get("/orders")]
pub async fn list_orders(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let orders = OrderRepository::new(&state.db)
        .list_recent()
        .await
        .or_api("Failed to fetch orders")?;

    Ok(HttpResponse::Ok().json(OrderListResponse {
        count: orders.len(),
        orders,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "orders",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::models::ErrorResponse),
    )
)]
#[get("/orders/{id}")]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order = OrderRepository::new(&state.db)
        .find_by_id(&path)
        .await
        .or_api("Failed to fetch order")?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    Ok(HttpResponse::Ok().json(OrderResponse {
        message: None,
        order,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

/// Place a new order
#[utoipa::path(
    post,
    path = "/orders",
    tag = "orders",
    request_body = CreateOrderBody,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid input", body = crate::models::ErrorResponse),
    )
)]
#[post("/orders")]
pub async fn create_order(
    state: web::Data<AppState>,
    payload: web::Json<CreateOrderBody>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let body = payload.into_inner();

    let order = OrderRepository::new(&state.db)
        .create(CreateOrderRequest {
            user_id: body.user_id,
            product_id: body.product_id,
            quantity: body.quantity,
        })
        .await
        .or_api("Failed to create order")?;

    state.metrics.orders_created.inc();
    info!(order_id = %order.id, user_id = order.user_id, "Order created");

    Ok(HttpResponse::Created().json(OrderResponse {
        message: Some("Order created successfully".to_string()),
        order,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_orders)
        .service(create_order)
        .service(get_order);
}
