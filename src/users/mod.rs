//! User management subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → service.rs (validate email, pick breaker)
//!     → CircuitBreaker (admit or short-circuit)
//!     → repository.rs (persist)
//!     → events.rs (announce create/delete)
//! ```

pub mod error;
pub mod events;
pub mod model;
pub mod repository;
pub mod service;

pub use error::{ServiceError, UserLookup};
pub use events::{ChannelPublisher, EventDispatcher, EventPublisher, EventType, PublishError, UserEvent};
pub use model::{normalize_email, User, UserDraft};
pub use repository::{InMemoryUserRepository, RepositoryError, UserRepository};
pub use service::UserService;
