//! Gateway-generated responses.
//!
//! # Responsibilities
//! - Name every way a request can end without a backend response
//! - Map each to an HTTP status code and a short plain-text body
//!
//! # Design Decisions
//! - Backend responses pass through untouched; only the gateway's own
//!   outcomes are built here
//! - Raw connection errors are logged, never sent to the client
//! - Backend timeouts result in 504 Gateway Timeout

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::routing::RouteMiss;

/// A request that ended inside the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Service '{service}' not found")]
    ServiceNotFound { service: String },

    #[error("No route for '{path}' in service '{service}'")]
    RouteNotFound { service: String, path: String },

    #[error("Unauthorized")]
    AuthDenied,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error("Bad gateway")]
    BackendUnreachable {
        service: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("Gateway timeout")]
    BackendTimeout { service: String, timeout: Duration },

    #[error("Internal server error")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::ServiceNotFound { .. } | GatewayError::RouteNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::AuthDenied => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RouteMiss> for GatewayError {
    fn from(miss: RouteMiss) -> Self {
        match miss {
            RouteMiss::UnknownService { service } => GatewayError::ServiceNotFound { service },
            RouteMiss::NoMatchingRoute { service, path } => {
                GatewayError::RouteNotFound { service, path }
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.to_string()).into_response();

        if let GatewayError::RateLimited { retry_after } = &self {
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}
