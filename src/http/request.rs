//! Inbound request types.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Define the JSON bodies accepted by the user endpoints
//! - Wrap axum's extractors so their rejections render as JSON errors
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A caller-supplied `x-request-id` is kept, not replaced

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::{HeaderName, HeaderValue, Request};
use serde::{Deserialize, Serialize};
use tower_http::request_id::{MakeRequestId, RequestId};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::http::response::InvalidRequest;

/// Header carrying the request ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// JSON body extractor.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(InvalidRequest))]
pub struct JsonBody<T>(pub T);

/// Query string extractor.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(InvalidRequest))]
pub struct QueryParams<T>(pub T);

/// Path parameter extractor.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(InvalidRequest))]
pub struct PathParams<T>(pub T);

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "jane@example.com")]
    pub email: String,
}

/// Body of `PUT /users/{id}/email`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateEmailRequest {
    #[schema(example = "jane.doe@example.com")]
    pub email: String,
}

/// Query of `GET /users`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    /// Email address to look up.
    pub email: String,
}
