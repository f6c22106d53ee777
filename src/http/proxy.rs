//! Reverse-proxy transport.
//!
//! # Responsibilities
//! - Rewrite the inbound request to target a service's upstream
//! - Forward method, headers and body; stream the response back
//! - Bound the wait for the backend's response head
//!
//! # Design Decisions
//! - One pooled hyper client shared by every request
//! - Outbound requests are HTTP/1.1 regardless of the inbound version
//! - Dropping the returned future (client went away) aborts the backend call
//! - No retries: a failed call is the end of the request

use std::net::IpAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, Version};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::response::GatewayError;
use crate::routing::ServiceDefinition;
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};

/// Forwards requests to backend services.
#[derive(Clone)]
pub struct ProxyTransport {
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
}

impl ProxyTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            upstream_timeout: timeouts.upstream(),
        }
    }

    /// Send `request` to `service` on behalf of `client`.
    pub async fn forward(
        &self,
        service: &ServiceDefinition,
        client: IpAddr,
        request: Request<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = service.upstream.target_uri(&parts.uri).map_err(|e| {
            GatewayError::Internal(format!("cannot build upstream uri: {e}"))
        })?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        append_forwarded_for(&mut parts.headers, client);

        tracing::debug!(service = %service.name, target = %parts.uri, "Forwarding request");

        let outbound = Request::from_parts(parts, body);
        let pending = self.client.request(outbound);
        let response: Response<Incoming> = match tokio::time::timeout(self.upstream_timeout, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                return Err(GatewayError::BackendUnreachable {
                    service: service.name.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(GatewayError::BackendTimeout {
                    service: service.name.clone(),
                    timeout: self.upstream_timeout,
                })
            }
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl std::fmt::Debug for ProxyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyTransport")
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}
