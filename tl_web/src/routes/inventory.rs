//! ABOUTME: Inventory endpoints for stock listing, updates and availability checks
//! ABOUTME: Availability checks are advisory reads and never reserve stock

use crate::{
    error::{ApiError, ResultExt},
    models::{
        AvailabilityResponse, InventoryCheckRequest, InventoryListResponse,
        ProductResponse, UpdateInventoryRequest,
    },
    AppState,
};
use actix_web::{get, post, put, web, HttpResponse, Result};
use serde_json::json;
use tl_core::Error;
use tl_db::InventoryRepository;
use tracing::{debug, info};
use validator::Validate;

/// List all inventory items
#[utoipa::path(
    get,
    path = "/inventory",
    tag = "inventory",
    responses(
        (status = 200, description = "All inventory items", body = InventoryListResponse),
        (status = 500, description = "Store failure", body = crate::models::ErrorResponse),
    )
)]
#[get("/inventory")]
pub async fn list_inventory(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let items = InventoryRepository::new(&state.db)
        .list()
        .await
        .or_api("Failed to fetch inventory")?;

    state.metrics.items_total.set(items.len() as i64);

    Ok(HttpResponse::Ok().json(InventoryListResponse {
        count: items.len(),
        inventory: items,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/inventory/{id}",
    tag = "inventory",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 400, description = "Invalid product ID", body = crate::models::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::models::ErrorResponse),
    )
)]
#[get("/inventory/{id}")]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let product_id = parse_product_id(&path, "Invalid product ID")?;

    let product = InventoryRepository::new(&state.db)
        .find_by_id(product_id)
        .await
        .or_api("Failed to fetch product")?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    Ok(HttpResponse::Ok().json(ProductResponse {
        message: None,
        product,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

/// Set the stock level of a product
#[utoipa::path(
    put,
    path = "/inventory/{id}",
    tag = "inventory",
    params(("id" = i64, Path, description = "Product id")),
    request_body = UpdateInventoryRequest,
    responses(
        (status = 200, description = "Inventory updated", body = ProductResponse),
        (status = 400, description = "Invalid input", body = crate::models::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::models::ErrorResponse),
    )
)]
#[put("/inventory/{id}")]
pub async fn update_inventory(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateInventoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let product_id = parse_product_id(&path, "Invalid input")?;
    payload.validate()?;

    let product = InventoryRepository::new(&state.db)
        .update_quantity(product_id, payload.quantity)
        .await
        .or_api("Failed to update inventory")?;

    info!(product_id, quantity = product.quantity, "Inventory updated");

    Ok(HttpResponse::Ok().json(ProductResponse {
        message: Some("Inventory updated successfully".to_string()),
        product,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

/// Check whether a quantity is currently in stock.
///
/// The answer is advisory: nothing is reserved, so concurrent callers may all
/// be told the same units are available.
#[utoipa::path(
    post,
    path = "/inventory/check",
    tag = "inventory",
    request_body = InventoryCheckRequest,
    responses(
        (status = 200, description = "Availability computed", body = AvailabilityResponse),
        (status = 400, description = "Invalid request", body = crate::models::ErrorResponse),
        (status = 404, description = "Product not found"),
    )
)]
#[post("/inventory/check")]
pub async fn check_inventory(
    state: web::Data<AppState>,
    payload: web::Json<InventoryCheckRequest>,
) -> Result<HttpResponse, ApiError> {
    let (product_id, quantity) = match (payload.product_id, payload.quantity) {
        (Some(product_id), Some(quantity)) if quantity > 0 => (product_id, quantity),
        _ => return Err(ApiError::bad_request("Invalid request")),
    };

    let result = InventoryRepository::new(&state.db)
        .check_availability(product_id, quantity)
        .await;

    match result {
        Ok(availability) => {
            debug!(
                product_id,
                requested = quantity,
                available = availability.available,
                "Inventory checked"
            );
            Ok(HttpResponse::Ok().json(AvailabilityResponse {
                availability,
                pod_name: state.identity.pod_name.clone(),
                version: state.identity.version.clone(),
            }))
        }
        Err(Error::NotFound(_)) => Ok(HttpResponse::NotFound().json(json!({
            "available": false,
            "error": "Product not found",
        }))),
        Err(e) => Err(ApiError::from_core(e, "Failed to check inventory")),
    }
}

fn parse_product_id(raw: &str, message: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::bad_request(message))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // the literal check route must win over the `{id}` template
    cfg.service(check_inventory)
        .service(list_inventory)
        .service(get_product)
        .service(update_inventory);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_id() {
        assert_eq!(parse_product_id("42", "bad").unwrap(), 42);
        let err = parse_product_id("abc", "Invalid product ID").unwrap_err();
        assert_eq!(err.body.error, "Invalid product ID");
        assert!(parse_product_id("1.5", "bad").is_err());
    }
}
