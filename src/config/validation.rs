//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse every backend base URL and route pattern once, before startup
//! - Detect duplicate services and routes
//! - Validate value ranges (0 < window <= one year, timeouts > 0, bind address)
//! - Service names must be plain literal path segments
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::routing::matcher::{PathPattern, PatternError};
use crate::routing::router::Upstream;
use crate::security::rate_limit::MAX_WINDOW;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyServiceName,
    #[error("service name '{0}' must be a plain path segment (letters, digits, '-', '.', '_', '~')")]
    InvalidServiceName(String),
    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),
    #[error("service '{0}' is not defined")]
    UnknownService(String),
    #[error("service '{service}' has invalid base_url '{url}': {reason}")]
    InvalidBaseUrl {
        service: String,
        url: String,
        reason: String,
    },
    #[error("service '{service}' has invalid route '{path}': {source}")]
    InvalidRoute {
        service: String,
        path: String,
        source: PatternError,
    },
    #[error("service '{service}' registers route '{path}' more than once")]
    DuplicateRoute { service: String, path: String },
    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,
    #[error("rate_limit.window_secs must be at most {max}, got {got}")]
    WindowTooLarge { got: u64, max: u64 },
    #[error("timeouts.upstream_ms must be greater than zero")]
    ZeroUpstreamTimeout,
    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    } else if config.rate_limit.window_secs > MAX_WINDOW.as_secs() {
        errors.push(ValidationError::WindowTooLarge {
            got: config.rate_limit.window_secs,
            max: MAX_WINDOW.as_secs(),
        });
    }
    if config.timeouts.upstream_ms == 0 {
        errors.push(ValidationError::ZeroUpstreamTimeout);
    }

    let mut names = HashSet::new();
    for service in &config.services {
        if service.name.is_empty() {
            errors.push(ValidationError::EmptyServiceName);
        } else if !is_plain_segment(&service.name) {
            errors.push(ValidationError::InvalidServiceName(service.name.clone()));
        }
        if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        if let Err(reason) = Upstream::parse(&service.base_url) {
            errors.push(ValidationError::InvalidBaseUrl {
                service: service.name.clone(),
                url: service.base_url.clone(),
                reason,
            });
        }

        let mut paths = HashSet::new();
        for route in &service.routes {
            // Route paths are appended to `/{service}`, so they need their own leading slash.
            let parsed = if route.path.starts_with('/') {
                PathPattern::parse(&format!("/{}{}", service.name, route.path)).map(|_| ())
            } else {
                Err(PatternError::MissingLeadingSlash)
            };
            if let Err(source) = parsed {
                errors.push(ValidationError::InvalidRoute {
                    service: service.name.clone(),
                    path: route.path.clone(),
                    source,
                });
            }
            if !paths.insert(route.path.as_str()) {
                errors.push(ValidationError::DuplicateRoute {
                    service: service.name.clone(),
                    path: route.path.clone(),
                });
            }
        }

        if service.routes.is_empty() {
            tracing::warn!(service = %service.name, "Service has no routes");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A segment that matches itself literally: RFC 3986 unreserved characters
/// only, and not a dot segment.
fn is_plain_segment(name: &str) -> bool {
    name != "."
        && name != ".."
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}
