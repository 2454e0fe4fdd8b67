//! User entity and its mapping helpers.

use serde::{Deserialize, Serialize};

use crate::users::error::ServiceError;

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
}

impl User {
    /// Draft carrying this user's id with a new email, ready to save.
    pub fn with_email(&self, email: impl Into<String>) -> UserDraft {
        UserDraft {
            id: Some(self.id),
            email: email.into(),
        }
    }
}

/// A user about to be saved. `id: None` inserts, `Some` updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub id: Option<u64>,
    pub email: String,
}

impl UserDraft {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
        }
    }
}

/// Trim and sanity-check an email address.
pub fn normalize_email(raw: &str) -> Result<String, ServiceError> {
    let email = raw.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(ServiceError::InvalidEmail(raw.to_string()));
    }
    Ok(email.to_string())
}
