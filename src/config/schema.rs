//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the user service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// User event publishing.
    pub events: EventsConfig,

    /// User operations.
    pub users: UsersConfig,

    /// Circuit breaker defaults and named instances.
    pub circuit_breakers: CircuitBreakersConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024, // 64KB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder key rejected by validation when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// User event publishing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Topic name attached to every published event.
    pub topic: String,

    /// Capacity of the in-process event queue.
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            topic: "user-events".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// User operations configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UsersConfig {
    /// Breaker guarding create, update and delete.
    pub write_breaker: String,

    /// Breaker guarding lookups.
    pub read_breaker: String,

    /// Only infrastructure failures count toward the failure rate.
    /// When false, "not found" and "already exists" trip breakers too.
    pub classify_domain_errors: bool,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            write_breaker: "user-writes".to_string(),
            read_breaker: "user-reads".to_string(),
            classify_domain_errors: true,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CircuitBreakersConfig {
    /// Settings for every breaker not listed in `instances`.
    pub default: BreakerConfig,

    /// Per-name overrides, merged onto `default`.
    pub instances: BTreeMap<String, BreakerOverrides>,
}

/// Settings of a single circuit breaker.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Failure percentage at which the breaker opens.
    pub failure_rate_threshold: f64,

    /// Number of recent calls considered.
    pub sliding_window_size: usize,

    /// Calls required before the failure rate is evaluated.
    pub minimum_number_of_calls: usize,

    /// Cooldown before trial calls are admitted, in milliseconds.
    pub wait_duration_in_open_state_ms: u64,

    /// Trial calls admitted while half-open.
    pub permitted_calls_in_half_open: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
            minimum_number_of_calls: 5,
            wait_duration_in_open_state_ms: 10_000,
            permitted_calls_in_half_open: 3,
        }
    }
}

/// Partial breaker settings for a named instance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreakerOverrides {
    pub failure_rate_threshold: Option<f64>,
    pub sliding_window_size: Option<usize>,
    pub minimum_number_of_calls: Option<usize>,
    pub wait_duration_in_open_state_ms: Option<u64>,
    pub permitted_calls_in_half_open: Option<u32>,
}

impl BreakerOverrides {
    /// Fill unset fields from `base`.
    pub fn apply(&self, base: &BreakerConfig) -> BreakerConfig {
        BreakerConfig {
            failure_rate_threshold: self.failure_rate_threshold.unwrap_or(base.failure_rate_threshold),
            sliding_window_size: self.sliding_window_size.unwrap_or(base.sliding_window_size),
            minimum_number_of_calls: self.minimum_number_of_calls.unwrap_or(base.minimum_number_of_calls),
            wait_duration_in_open_state_ms: self
                .wait_duration_in_open_state_ms
                .unwrap_or(base.wait_duration_in_open_state_ms),
            permitted_calls_in_half_open: self
                .permitted_calls_in_half_open
                .unwrap_or(base.permitted_calls_in_half_open),
        }
    }
}
