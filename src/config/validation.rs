//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the backend URL and that the strategy can reach it
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Validate rule table entries
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{ForwardStrategy, ProxyConfig};
use crate::forward::target::BackendTarget;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
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

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }

    match BackendTarget::parse(&config.backend.url) {
        Ok(target) => {
            if config.backend.strategy == ForwardStrategy::Delegate && target.scheme() != "http" {
                errors.push(ValidationError::new(
                    "backend.strategy",
                    "the delegate strategy only speaks plain http; use `manual` for https backends",
                ));
            }
        }
        Err(e) => errors.push(ValidationError::new("backend.url", e.to_string())),
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.tls_handshake_secs", timeouts.tls_handshake_secs),
        ("timeouts.response_header_secs", timeouts.response_header_secs),
        ("timeouts.idle_secs", timeouts.idle_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    for method in &config.policy.allowed_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "policy.allowed_methods",
                format!("`{method}` is not a valid HTTP method"),
            ));
        }
    }

    for (field, paths) in [
        ("policy.get_path_prefixes", &config.policy.get_path_prefixes),
        ("policy.post_paths", &config.policy.post_paths),
        ("policy.put_paths", &config.policy.put_paths),
    ] {
        for path in paths {
            if !path.starts_with('/') {
                errors.push(ValidationError::new(
                    field,
                    format!("`{path}` must start with `/`"),
                ));
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
