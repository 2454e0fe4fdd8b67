//! Outbound response types.
//!
//! # Responsibilities
//! - Render users with hypermedia links to the next operations
//! - Map service errors and extractor rejections to JSON error bodies
//!
//! # Design Decisions
//! - Domain errors keep their message; 4xx tells the caller what to fix
//! - Infrastructure detail is logged, never returned to the client

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::users::{ServiceError, User};

/// A single hypermedia link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Link {
    pub href: String,
}

/// A user as returned over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: u64,
    pub email: String,
    #[serde(rename = "_links")]
    pub links: BTreeMap<String, Link>,
}

impl UserResponse {
    /// Response to a create: how to read and delete the new user.
    pub fn created(user: User) -> Self {
        let links = [get_user(&user), delete_user(&user)];
        Self::with_links(user, links)
    }

    /// Response to a lookup: how to change or delete the user.
    pub fn fetched(user: User) -> Self {
        let links = [update_email(&user), delete_user(&user)];
        Self::with_links(user, links)
    }

    /// Response to an email change: how to read the user back.
    pub fn updated(user: User) -> Self {
        let links = [get_user(&user)];
        Self::with_links(user, links)
    }

    fn with_links<const N: usize>(user: User, links: [(&str, Link); N]) -> Self {
        Self {
            id: user.id,
            email: user.email,
            links: links
                .into_iter()
                .map(|(rel, link)| (rel.to_string(), link))
                .collect(),
        }
    }
}

fn get_user(user: &User) -> (&'static str, Link) {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("email", &user.email)
        .finish();
    ("get-user", Link { href: format!("/users?{query}") })
}

fn update_email(user: &User) -> (&'static str, Link) {
    ("update-email", Link { href: format!("/users/{}/email", user.id) })
}

fn delete_user(user: &User) -> (&'static str, Link) {
    ("delete-user", Link { href: format!("/users/{}", user.id) })
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

pub fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::AlreadyExists(_) => StatusCode::CONFLICT,
        ServiceError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
        ServiceError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = match &self {
            ServiceError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Unhandled infrastructure error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody::new(self.kind(), message))).into_response()
    }
}

/// A request axum could not extract: bad JSON, missing query, malformed path.
#[derive(Debug)]
pub struct InvalidRequest {
    status: StatusCode,
    message: String,
}

impl From<JsonRejection> for InvalidRequest {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for InvalidRequest {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for InvalidRequest {
    fn from(rejection: PathRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for InvalidRequest {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, message = %self.message, "Request rejected");
        (self.status, Json(ErrorBody::new("invalid_request", self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserLookup;
    use axum::body::to_bytes;

    fn user() -> User {
        User { id: 7, email: "a+b@x.com".into() }
    }

    #[test]
    fn test_created_links() {
        let json = serde_json::to_value(UserResponse::created(user())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "email": "a+b@x.com",
                "_links": {
                    "get-user": { "href": "/users?email=a%2Bb%40x.com" },
                    "delete-user": { "href": "/users/7" }
                }
            })
        );
    }

    #[test]
    fn test_fetched_and_updated_links() {
        let fetched = UserResponse::fetched(user());
        assert_eq!(
            fetched.links.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["delete-user", "update-email"]
        );
        assert_eq!(fetched.links["update-email"].href, "/users/7/email");

        let updated = UserResponse::updated(user());
        assert_eq!(updated.links.len(), 1);
        assert!(updated.links.contains_key("get-user"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&ServiceError::NotFound(UserLookup::Id(1))), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&ServiceError::AlreadyExists("a@x.com".into())), StatusCode::CONFLICT);
        assert_eq!(status_for(&ServiceError::InvalidEmail("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&ServiceError::ServiceUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_for(&ServiceError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_infrastructure_detail_not_leaked() {
        let response = ServiceError::Infrastructure("password=hunter2".into()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, ErrorBody::new("infrastructure", "Internal server error"));
    }

    #[tokio::test]
    async fn test_unavailable_body() {
        let response = ServiceError::ServiceUnavailable.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            ErrorBody::new(
                "service_unavailable",
                "Service temporarily unavailable. Please try again later."
            )
        );
    }
}
