//! User endpoint handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::http::request::{CreateUserRequest, EmailQuery, JsonBody, PathParams, QueryParams, UpdateEmailRequest};
use crate::http::response::{ErrorBody, UserResponse};
use crate::users::{ServiceError, UserService};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid email or malformed body", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 503, description = "User writes temporarily unavailable", body = ErrorBody)
    )
)]
/// Register a new user.
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.users.create_user(&request.email).await?;
    tracing::info!(user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::created(user))))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(EmailQuery),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, description = "Missing or invalid email", body = ErrorBody),
        (status = 404, description = "No user with that email", body = ErrorBody),
        (status = 503, description = "User reads temporarily unavailable", body = ErrorBody)
    )
)]
/// Look a user up by email.
pub async fn get_user_by_email(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<EmailQuery>,
) -> Result<Json<UserResponse>, ServiceError> {
    let user = state.users.get_user_by_email(&query.email).await?;
    Ok(Json(UserResponse::fetched(user)))
}

#[utoipa::path(
    put,
    path = "/users/{id}/email",
    tag = "users",
    params(("id" = u64, Path, description = "User id")),
    request_body = UpdateEmailRequest,
    responses(
        (status = 200, description = "Email changed", body = UserResponse),
        (status = 400, description = "Invalid email, id or body", body = ErrorBody),
        (status = 404, description = "No user with that id", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 503, description = "User writes temporarily unavailable", body = ErrorBody)
    )
)]
/// Change a user's email.
pub async fn update_user_email(
    State(state): State<AppState>,
    PathParams(id): PathParams<u64>,
    JsonBody(request): JsonBody<UpdateEmailRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    let user = state.users.update_user_email(id, &request.email).await?;
    Ok(Json(UserResponse::updated(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted, or already absent"),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 503, description = "User writes temporarily unavailable", body = ErrorBody)
    )
)]
/// Delete a user. Unknown ids succeed.
pub async fn delete_user(
    State(state): State<AppState>,
    PathParams(id): PathParams<u64>,
) -> Result<StatusCode, ServiceError> {
    state.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    #[schema(value_type = String, example = "ok")]
    pub status: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is alive", body = Health))
)]
/// Liveness probe.
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}
