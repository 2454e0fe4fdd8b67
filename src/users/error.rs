//! Error taxonomy of the user operations.

use std::fmt;

use thiserror::Error;

use crate::users::repository::RepositoryError;

/// How a missing user was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(u64),
    Email(String),
}

impl fmt::Display for UserLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserLookup::Id(id) => write!(f, "id: {}", id),
            UserLookup::Email(email) => write!(f, "email: {}", email),
        }
    }
}

/// Errors returned by [`UserService`](crate::users::UserService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("User not found with {0}")]
    NotFound(UserLookup),

    #[error("User already exists with email: {0}")]
    AlreadyExists(String),

    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),

    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),

    /// Only produced by fallbacks.
    #[error("Service temporarily unavailable. Please try again later.")]
    ServiceUnavailable,
}

impl ServiceError {
    /// Whether this error says something about the health of a dependency.
    pub fn trips_breaker(&self) -> bool {
        matches!(self, ServiceError::Infrastructure(_))
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::AlreadyExists(_) => "already_exists",
            ServiceError::InvalidEmail(_) => "invalid_email",
            ServiceError::Infrastructure(_) => "infrastructure",
            ServiceError::ServiceUnavailable => "service_unavailable",
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail(email) => ServiceError::AlreadyExists(email),
            RepositoryError::MissingRow(id) => ServiceError::NotFound(UserLookup::Id(id)),
            RepositoryError::Unavailable(reason) => ServiceError::Infrastructure(reason),
        }
    }
}
