//! Machine-readable description of the user API.

use axum::Json;
use utoipa::OpenApi;

use crate::http::handlers::{self, Health};
use crate::http::request::{CreateUserRequest, UpdateEmailRequest};
use crate::http::response::{ErrorBody, Link, UserResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "User Service API",
        description = "User registration and lookup, guarded by circuit breakers"
    ),
    paths(
        handlers::create_user,
        handlers::get_user_by_email,
        handlers::update_user_email,
        handlers::delete_user,
        handlers::health,
    ),
    components(
        schemas(
            CreateUserRequest,
            UpdateEmailRequest,
            UserResponse,
            Link,
            ErrorBody,
            Health,
        )
    ),
    tags(
        (name = "users", description = "User management"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// `GET /openapi.json`
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
