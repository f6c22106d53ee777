//! Authentication gate.
//!
//! The dispatcher asks an [`AuthGate`] about every resolved request before
//! any rate-limit accounting happens. Policy lives entirely behind the
//! trait; the gateway ships only [`AllowAll`].

use axum::http::request::Parts;

use crate::routing::ResolvedRoute;

/// Verdict of an [`AuthGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied,
}

/// Stateless allow/deny predicate over an inbound request.
pub trait AuthGate: Send + Sync {
    fn authenticate(&self, request: &Parts, route: &ResolvedRoute) -> AuthDecision;
}

/// Admits every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthGate for AllowAll {
    fn authenticate(&self, _request: &Parts, _route: &ResolvedRoute) -> AuthDecision {
        AuthDecision::Allowed
    }
}

impl<F> AuthGate for F
where
    F: Fn(&Parts, &ResolvedRoute) -> AuthDecision + Send + Sync,
{
    fn authenticate(&self, request: &Parts, route: &ResolvedRoute) -> AuthDecision {
        self(request, route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, RouteConfig, ServiceConfig};
    use crate::routing::RouteTable;
    use axum::http::Request;

    fn resolved() -> ResolvedRoute {
        let config = GatewayConfig {
            services: vec![ServiceConfig {
                name: "orders".into(),
                base_url: "http://localhost:9001".into(),
                routes: vec![RouteConfig { path: "/list".into() }],
            }],
            ..GatewayConfig::default()
        };
        RouteTable::from_config(&config)
            .unwrap()
            .resolve("/orders/list")
            .unwrap()
    }

    #[test]
    fn test_allow_all() {
        let (parts, _) = Request::builder().uri("/orders/list").body(()).unwrap().into_parts();
        assert_eq!(AllowAll.authenticate(&parts, &resolved()), AuthDecision::Allowed);
    }

    #[test]
    fn test_closure_gate() {
        let gate = |parts: &Parts, _: &ResolvedRoute| {
            if parts.headers.contains_key("authorization") {
                AuthDecision::Allowed
            } else {
                AuthDecision::Denied
            }
        };
        let route = resolved();

        let (anonymous, _) = Request::builder().body(()).unwrap().into_parts();
        let (signed, _) = Request::builder()
            .header("Authorization", "Bearer token")
            .body(())
            .unwrap()
            .into_parts();

        assert_eq!(gate.authenticate(&anonymous, &route), AuthDecision::Denied);
        assert_eq!(gate.authenticate(&signed, &route), AuthDecision::Allowed);
    }
}
