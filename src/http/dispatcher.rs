//! Per-request pipeline.
//!
//! ```text
//! Received → RouteResolved → Authenticated → RateChecked → Proxied → Completed
//!     │            │               │               │
//!     └ NotFound   └ Denied        └ RateLimited   └ BadGateway / GatewayTimeout
//! ```
//!
//! Every early exit becomes a [`GatewayError`] response; nothing here can
//! take the server down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;

use crate::config::GatewayConfig;
use crate::http::proxy::ProxyTransport;
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::routing::{ResolvedRoute, RouteTable};
use crate::security::headers::client_ip;
use crate::security::{AuthDecision, AuthGate, RateDecision, RateLimitKey, RateLimiter};

/// Routes, authenticates, rate-limits and forwards requests.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    auth: Arc<dyn AuthGate>,
    limiter: Arc<RateLimiter>,
    transport: ProxyTransport,
    window: Duration,
    limit: u32,
    trust_forwarded_for: bool,
}

impl Dispatcher {
    pub fn new(
        config: &GatewayConfig,
        routes: Arc<RouteTable>,
        auth: Arc<dyn AuthGate>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            routes,
            auth,
            limiter,
            transport: ProxyTransport::new(&config.timeouts),
            window: config.rate_limit.window(),
            limit: config.rate_limit.count,
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        }
    }

    /// Run the full pipeline for one request.
    pub async fn handle(&self, peer: SocketAddr, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let method = metrics::method_label(request.method());

        let (service, outcome) = match self.routes.resolve(request.uri().path()) {
            Ok(resolved) => {
                let service = resolved.service().name.clone();
                (service, self.dispatch(peer, resolved, request).await)
            }
            Err(miss) => (metrics::service_label(&miss).to_string(), Err(miss.into())),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                self.log_failure(&service, peer, &error);
                error.into_response()
            }
        };

        metrics::record_request(&service, method, response.status().as_u16(), start);
        response
    }

    async fn dispatch(
        &self,
        peer: SocketAddr,
        resolved: ResolvedRoute,
        request: Request<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        let service = resolved.binding.service.clone();

        let (mut parts, body) = request.into_parts();
        if self.auth.authenticate(&parts, &resolved) == AuthDecision::Denied {
            return Err(GatewayError::AuthDenied);
        }

        let client = client_ip(&parts.headers, peer, self.trust_forwarded_for);
        let key = RateLimitKey::new(service.name.as_str(), client.to_string());
        if let RateDecision::Limited { retry_after } =
            self.limiter.check_and_increment(&key, self.window, self.limit)
        {
            return Err(GatewayError::RateLimited { retry_after });
        }

        tracing::debug!(
            service = %service.name,
            route = %resolved.binding.route,
            client = %client,
            "Proxying request"
        );

        parts.extensions.insert(resolved.params);
        self.transport
            .forward(&service, client, Request::from_parts(parts, body))
            .await
    }

    fn log_failure(&self, service: &str, peer: SocketAddr, error: &GatewayError) {
        match error {
            GatewayError::ServiceNotFound { .. } | GatewayError::RouteNotFound { .. } => {
                tracing::warn!(error = %error, "No route matched");
            }
            GatewayError::AuthDenied => {
                metrics::record_auth_denied(service);
                tracing::warn!(service = %service, peer = %peer, "Unauthorized request");
            }
            GatewayError::RateLimited { retry_after } => {
                metrics::record_rate_limited(service);
                tracing::warn!(
                    service = %service,
                    peer = %peer,
                    retry_after = ?retry_after,
                    "Rate limit exceeded"
                );
            }
            GatewayError::BackendUnreachable { source, .. } => {
                metrics::record_upstream_error(service, "unreachable");
                tracing::error!(service = %service, error = %source, "Upstream request failed");
            }
            GatewayError::BackendTimeout { timeout, .. } => {
                metrics::record_upstream_error(service, "timeout");
                tracing::error!(service = %service, timeout = ?timeout, "Upstream timed out");
            }
            GatewayError::Internal(detail) => {
                tracing::error!(service = %service, detail = %detail, "Internal gateway error");
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("limiter", &self.limiter)
            .field("window", &self.window)
            .field("limit", &self.limit)
            .finish()
    }
}
