//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (chain target has a downstream URL)
//! - Validate value ranges (timeouts > 0, correlation id bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::{Role, ServiceConfig};

/// Shortest id the propagator must be able to adopt (a hyphenated UUID).
const MIN_CORRELATION_LENGTH: usize = 36;
const MAX_CORRELATION_LENGTH: usize = 1024;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("downstream.{role} '{url}' is not an http(s) URL")]
    DownstreamUrl { role: Role, url: String },

    #[error("downstream.{0} points at the service itself")]
    SelfDownstream(Role),

    #[error("chain.next = '{0}' has no downstream URL")]
    ChainTargetMissing(Role),

    #[error("chain.next cannot be the service's own role '{0}'")]
    ChainTargetIsSelf(Role),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("correlation.header '{0}' is not a valid header name")]
    HeaderName(String),

    #[error("correlation.max_length {0} is outside 36..=1024")]
    CorrelationLength(usize),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let role = config.service.role;

    let bind_address = config.bind_address();
    if bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(bind_address));
    }

    for (target, url) in config.downstream.entries() {
        if target == role {
            errors.push(ValidationError::SelfDownstream(target));
        }
        let valid = Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::DownstreamUrl {
                role: target,
                url: url.to_string(),
            });
        }
    }

    if let Some(next) = config.chain.next {
        if next == role {
            errors.push(ValidationError::ChainTargetIsSelf(next));
        } else if config.downstream.url(next).is_none() {
            errors.push(ValidationError::ChainTargetMissing(next));
        }
    }

    let timeouts = &config.timeouts;
    if timeouts.handler_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("handler_secs"));
    }
    if timeouts.downstream_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("downstream_ms"));
    }
    if timeouts.downstream_connect_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("downstream_connect_ms"));
    }

    if HeaderName::try_from(config.correlation.header.as_str()).is_err() {
        errors.push(ValidationError::HeaderName(config.correlation.header.clone()));
    }
    let max_length = config.correlation.max_length;
    if !(MIN_CORRELATION_LENGTH..=MAX_CORRELATION_LENGTH).contains(&max_length) {
        errors.push(ValidationError::CorrelationLength(max_length));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
