//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Service operation:
//!     → registry.rs (look up the named breaker for the operation group)
//!     → circuit_breaker.rs (admit or short-circuit, run primary, record outcome)
//!     → On rejection or failure: caller-supplied fallback
//! ```
//!
//! # Design Decisions
//! - Breakers live in an explicit registry, never in process-wide statics
//! - Fallbacks are plain closures passed to `execute`
//! - No retries; the only remediation is short-circuiting

pub mod circuit_breaker;
pub mod registry;

pub use circuit_breaker::{BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitState, FallbackCause};
pub use registry::BreakerRegistry;
