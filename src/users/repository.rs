//! User persistence.
//!
//! # Responsibilities
//! - Define the storage seam the service depends on
//! - Provide an in-process store keyed by id with a unique email index
//!
//! # Design Decisions
//! - Ids come from an atomic sequence and are never reused
//! - An email is claimed in the index before the row is written, so two
//!   concurrent inserts of the same email cannot both succeed
//! - Only `update` nests guards, always a `users` row before an `emails`
//!   entry; every other path releases one map before touching the other

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use crate::users::model::{User, UserDraft};

/// Errors raised by a [`UserRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The store could not serve the request.
    #[error("persistence unavailable: {0}")]
    Unavailable(String),

    /// The email is already stored for another user.
    #[error("email already stored: {0}")]
    DuplicateEmail(String),

    /// An update targeted a row that does not exist.
    #[error("no user row with id {0}")]
    MissingRow(u64),
}

/// Storage seam for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a draft without id, or update the row with the draft's id.
    async fn save(&self, user: UserDraft) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Delete a row. Absent ids are ignored.
    async fn delete_by_id(&self, id: u64) -> Result<(), RepositoryError>;
}

/// `DashMap`-backed user store.
#[derive(Debug)]
pub struct InMemoryUserRepository {
    users: DashMap<u64, User>,
    emails: DashMap<String, u64>,
    next_id: AtomicU64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn insert(&self, email: String) -> Result<User, RepositoryError> {
        let id = match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => return Err(RepositoryError::DuplicateEmail(email)),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                slot.insert(id);
                id
            }
        };
        let user = User { id, email };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn update(&self, id: u64, email: String) -> Result<User, RepositoryError> {
        // The row guard serializes updates of one id across the index change.
        let mut row = self.users.get_mut(&id).ok_or(RepositoryError::MissingRow(id))?;
        if row.email == email {
            return Ok(row.clone());
        }

        match self.emails.entry(email.clone()) {
            Entry::Occupied(owner) if *owner.get() != id => {
                return Err(RepositoryError::DuplicateEmail(email));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let previous = std::mem::replace(&mut row.email, email);
        self.emails.remove_if(&previous, |_, owner| *owner == id);
        Ok(row.clone())
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: UserDraft) -> Result<User, RepositoryError> {
        match user.id {
            None => self.insert(user.email),
            Some(id) => self.update(id, user.email),
        }
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let Some(id) = self.emails.get(email).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn delete_by_id(&self, id: u64) -> Result<(), RepositoryError> {
        if let Some((_, user)) = self.users.remove(&id) {
            self.emails.remove_if(&user.email, |_, owner| *owner == id);
        }
        Ok(())
    }
}
