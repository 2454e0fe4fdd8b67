//! User management service with circuit-breaker protected operations.

// Core subsystems
pub mod config;
pub mod http;
pub mod users;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
pub use resilience::{BreakerRegistry, CircuitBreaker, CircuitState};
pub use users::{ServiceError, User, UserService};
