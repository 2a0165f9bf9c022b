//! ABOUTME: User endpoints for profile CRUD
//! ABOUTME: Duplicate usernames or emails are client errors, not server failures

use crate::{
    error::{ApiError, ResultExt},
    models::{
        CreateUserBody, MessageResponse, UpdateUserBody, UserListResponse,
        UserResponse,
    },
    AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Result};
use tl_db::{CreateUserRequest, UpdateUserRequest, UserRepository};
use tracing::info;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses((status = 200, description = "All users", body = UserListResponse))
)]
#[get("/users")]
pub async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users = UserRepository::new(&state.db)
        .list()
        .await
        .or_api("Failed to fetch users")?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        count: users.len(),
        users,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found", body = crate::models::ErrorResponse),
    )
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = UserRepository::new(&state.db)
        .find_by_id(&path)
        .await
        .or_api("Failed to fetch user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        message: None,
        user,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserBody,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input or duplicate username/email", body = crate::models::ErrorResponse),
    )
)]
#[post("/users")]
pub async fn create_user(
    state: web::Data<AppState>,
    payload: web::Json<CreateUserBody>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let body = payload.into_inner();

    let user = UserRepository::new(&state.db)
        .create(CreateUserRequest {
            username: body.username,
            email: body.email,
            full_name: body.full_name,
        })
        .await
        .or_api("Failed to create user")?;

    state.metrics.users_created.inc();
    info!(user_id = %user.id, username = %user.username, "User created");

    Ok(HttpResponse::Created().json(UserResponse {
        message: Some("User created successfully".to_string()),
        user,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserBody,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "No fields to update", body = crate::models::ErrorResponse),
        (status = 404, description = "User not found", body = crate::models::ErrorResponse),
    )
)]
#[put("/users/{id}")]
pub async fn update_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateUserBody>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let body = payload.into_inner();

    let user = UserRepository::new(&state.db)
        .update(
            &path,
            UpdateUserRequest {
                email: body.email,
                full_name: body.full_name,
            },
        )
        .await
        .or_api("Failed to update user")?;

    Ok(HttpResponse::Ok().json(UserResponse {
        message: Some("User updated successfully".to_string()),
        user,
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = crate::models::ErrorResponse),
    )
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    UserRepository::new(&state.db)
        .delete(&path)
        .await
        .or_api("Failed to delete user")?;

    info!(user_id = %path, "User deleted");

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "User deleted successfully".to_string(),
        pod_name: state.identity.pod_name.clone(),
        version: state.identity.version.clone(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(create_user)
        .service(get_user)
        .service(update_user)
        .service(delete_user);
}
