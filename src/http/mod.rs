//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, JSON bodies, extractor rejections)
//!     → handlers.rs (call UserService)
//!     → response.rs (user links, error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod request;
pub mod response;
pub mod server;

pub use handlers::AppState;
pub use openapi::ApiDoc;
pub use request::{CreateUserRequest, UpdateEmailRequest, UuidRequestId, X_REQUEST_ID};
pub use response::{ErrorBody, InvalidRequest, Link, UserResponse};
pub use server::HttpServer;
