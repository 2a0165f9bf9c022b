//! ABOUTME: Data models for web API with validation and OpenAPI schemas
//! ABOUTME: Defines request/response structures with serde and validation

use serde::{Deserialize, Serialize};
use tl_db::{Availability, InventoryItem, Order, User};
use utoipa::ToSchema;
use validator::Validate;

/// Standard error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error class, e.g. `not_found` or `pool_timeout`
    pub kind: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.into(),
        }
    }
}

/// Body of `PUT /inventory/{id}`
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryRequest {
    #[validate(range(min = 0))]
    pub quantity: i64,
}

/// Body of `POST /inventory/check`; both fields are required and checked by hand
/// so that a missing field maps to the same 400 as a non-positive quantity
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryCheckRequest {
    pub product_id: Option<i64>,
    pub quantity: Option<i64>,
}

/// Body of `POST /orders`
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderBody {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(range(min = 1))]
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

/// Body of `POST /users`
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserBody {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
}

/// Body of `PUT /users/{id}`
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserBody {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryListResponse {
    pub inventory: Vec<InventoryItem>,
    pub count: usize,
    pub pod_name: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub product: InventoryItem,
    pub pod_name: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    #[serde(flatten)]
    pub availability: Availability,
    pub pod_name: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub count: usize,
    pub pod_name: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub order: Order,
    pub pod_name: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub count: usize,
    pub pod_name: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: User,
    pub pod_name: String,
    pub version: String,
}

/// Acknowledgement without an entity, e.g. after a delete
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    pub pod_name: String,
    pub version: String,
}
