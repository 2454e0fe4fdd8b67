//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse, breaker thresholds)
//! - Refuse to expose the admin API with the placeholder key
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{BreakerConfig, ServiceConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new("admin.api_key", "must be set when the admin API is enabled"));
        }
    }

    if config.events.topic.trim().is_empty() {
        errors.push(ValidationError::new("events.topic", "must not be empty"));
    }
    if config.events.channel_capacity == 0 {
        errors.push(ValidationError::new("events.channel_capacity", "must be greater than 0"));
    }

    if config.users.write_breaker.trim().is_empty() {
        errors.push(ValidationError::new("users.write_breaker", "must not be empty"));
    }
    if config.users.read_breaker.trim().is_empty() {
        errors.push(ValidationError::new("users.read_breaker", "must not be empty"));
    }

    let breakers = &config.circuit_breakers;
    check_breaker(&mut errors, "circuit_breakers.default", &breakers.default);
    for (name, overrides) in &breakers.instances {
        if name.trim().is_empty() {
            errors.push(ValidationError::new("circuit_breakers.instances", "breaker names must not be empty"));
        }
        let merged = overrides.apply(&breakers.default);
        check_breaker(&mut errors, &format!("circuit_breakers.instances.{}", name), &merged);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("'{}' is not a valid socket address", value)));
    }
}

fn check_breaker(errors: &mut Vec<ValidationError>, prefix: &str, breaker: &BreakerConfig) {
    let threshold = breaker.failure_rate_threshold;
    if !(threshold > 0.0 && threshold <= 100.0) {
        errors.push(ValidationError::new(
            format!("{}.failure_rate_threshold", prefix),
            "must be in (0, 100]",
        ));
    }
    if breaker.sliding_window_size == 0 {
        errors.push(ValidationError::new(
            format!("{}.sliding_window_size", prefix),
            "must be at least 1",
        ));
    }
    if breaker.minimum_number_of_calls == 0 || breaker.minimum_number_of_calls > breaker.sliding_window_size {
        errors.push(ValidationError::new(
            format!("{}.minimum_number_of_calls", prefix),
            "must be between 1 and sliding_window_size",
        ));
    }
    if breaker.wait_duration_in_open_state_ms == 0 {
        errors.push(ValidationError::new(
            format!("{}.wait_duration_in_open_state_ms", prefix),
            "must be greater than 0",
        ));
    }
    if breaker.permitted_calls_in_half_open == 0 {
        errors.push(ValidationError::new(
            format!("{}.permitted_calls_in_half_open", prefix),
            "must be at least 1",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BreakerOverrides;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        config.circuit_breakers.default.failure_rate_threshold = 150.0;
        config.circuit_breakers.default.permitted_calls_in_half_open = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "timeouts.request_secs",
                "circuit_breakers.default.failure_rate_threshold",
                "circuit_breakers.default.permitted_calls_in_half_open",
            ]
        );
    }

    #[test]
    fn test_instance_checked_after_merge() {
        let mut config = ServiceConfig::default();
        config.circuit_breakers.instances.insert(
            "user-reads".into(),
            BreakerOverrides {
                minimum_number_of_calls: Some(50),
                ..BreakerOverrides::default()
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].field,
            "circuit_breakers.instances.user-reads.minimum_number_of_calls"
        );
    }

    #[test]
    fn test_enabled_admin_requires_real_key() {
        let mut config = ServiceConfig::default();
        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "admin.api_key");

        config.admin.api_key = "s3cret".into();
        assert!(validate_config(&config).is_ok());
    }
}
