//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Require a secret whenever the shared-secret policy is active
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::{AuthMode, ProxyConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("auth.access_token is required when auth.mode is shared_secret (set ACCESS_TOKEN)")]
    MissingAccessToken,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("validation.allowed_content_types must not be empty")]
    EmptyAllowList,

    #[error("validation.allowed_content_types entry '{0}' is not a media type")]
    InvalidContentType(String),

    #[error("cors.allowed_origins entry '{0}' is not a valid origin header value")]
    InvalidCorsOrigin(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration for semantic problems.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.auth.mode == AuthMode::SharedSecret {
        let has_token = config
            .auth
            .access_token
            .as_deref()
            .is_some_and(|t| !t.is_empty());
        if !has_token {
            errors.push(ValidationError::MissingAccessToken);
        }
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream.timeout_secs"));
    }
    if config.upstream.read_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream.read_timeout_secs"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream.connect_timeout_secs"));
    }

    if config.validation.allowed_content_types.is_empty() {
        errors.push(ValidationError::EmptyAllowList);
    }
    for content_type in &config.validation.allowed_content_types {
        let well_formed = content_type
            .split_once('/')
            .is_some_and(|(kind, sub)| !kind.trim().is_empty() && !sub.trim().is_empty());
        if !well_formed {
            errors.push(ValidationError::InvalidContentType(content_type.clone()));
        }
    }

    for origin in &config.cors.allowed_origins {
        if origin != "*" && HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::InvalidCorsOrigin(origin.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
