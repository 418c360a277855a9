//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities > 0, addresses parse)
//! - Check that configured header values are sendable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.client.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("client.connect_timeout_secs", "must be greater than 0"));
    }

    if config.proxy.default_timeout_ms == 0 {
        errors.push(ValidationError::new("proxy.default_timeout_ms", "must be greater than 0"));
    }
    if config.proxy.max_body_bytes == 0 {
        errors.push(ValidationError::new("proxy.max_body_bytes", "must be greater than 0"));
    }
    if HeaderValue::from_str(&config.proxy.user_agent).is_err() {
        errors.push(ValidationError::new("proxy.user_agent", "not a valid header value"));
    }

    if config.discovery.max_body_bytes == 0 {
        errors.push(ValidationError::new("discovery.max_body_bytes", "must be greater than 0"));
    }
    if !matches!(config.discovery.probe_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::new(
            "discovery.probe_scheme",
            format!("expected http or https, got '{}'", config.discovery.probe_scheme),
        ));
    }
    if HeaderValue::from_str(&config.discovery.user_agent).is_err() {
        errors.push(ValidationError::new("discovery.user_agent", "not a valid header value"));
    }

    if config.events.subscriber_capacity == 0 {
        errors.push(ValidationError::new("events.subscriber_capacity", "must be greater than 0"));
    }

    if config.presets.path.trim().is_empty() {
        errors.push(ValidationError::new("presets.path", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.events.subscriber_capacity = 0;
        config.discovery.probe_scheme = "ftp".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "discovery.probe_scheme", "events.subscriber_capacity"]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
