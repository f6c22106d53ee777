//! Route table: registration and lookup.
//!
//! # Responsibilities
//! - Parse each service's base URL into an immutable upstream target
//! - Register one binding per (service, route) at `/{service}{route}`
//! - Look up the best binding for a request path, or report a miss
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) service lookup via HashMap on the first path segment
//! - O(n) scan over that service's bindings (acceptable for typical counts)
//! - Most specific pattern wins; ties go to the earliest registration
//! - Explicit miss rather than silent default
//! - Lookup uses the percent-decoded path; the backend receives the path
//!   exactly as the client sent it

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::uri::{Authority, PathAndQuery, Scheme, Uri};
use url::Url;

use crate::config::loader::ConfigError;
use crate::config::validation::ValidationError;
use crate::config::{GatewayConfig, ServiceConfig};
use crate::routing::matcher::{decode_segment, PathParams, PathPattern};

/// A parsed backend base URL. Built at startup so request handling never
/// parses configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
    display: String,
}

impl Upstream {
    /// Parse a backend base URL. Only plain `http` without query or
    /// fragment is accepted.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let url = Url::parse(raw).map_err(|e| e.to_string())?;
        if url.scheme() != "http" {
            return Err(format!("unsupported scheme '{}'", url.scheme()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err("query and fragment are not allowed".to_string());
        }
        let host = url.host_str().ok_or("missing host")?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::try_from(authority.as_str()).map_err(|e| e.to_string())?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
            display: url.to_string(),
        })
    }

    /// Build the absolute URI to forward to: base path joined with the
    /// inbound path by a single slash, inbound query kept.
    pub fn target_uri(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = inbound.path();
        let joined = match inbound.query() {
            Some(query) => format!("{}{}?{}", self.base_path, path, query),
            None => format!("{}{}", self.base_path, path),
        };
        let path_and_query = PathAndQuery::try_from(joined)?;

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// A logical backend service. Immutable after load.
#[derive(Debug)]
pub struct ServiceDefinition {
    pub name: String,
    pub upstream: Upstream,
    pub routes: Vec<String>,
}

impl ServiceDefinition {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ValidationError> {
        let upstream =
            Upstream::parse(&config.base_url).map_err(|reason| ValidationError::InvalidBaseUrl {
                service: config.name.clone(),
                url: config.base_url.clone(),
                reason,
            })?;

        Ok(Self {
            name: config.name.clone(),
            upstream,
            routes: config.routes.iter().map(|r| r.path.clone()).collect(),
        })
    }
}

/// One registered (service, route) pair.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    pub service: Arc<ServiceDefinition>,
    /// Route path as configured, relative to the service.
    pub route: String,
    /// Full registered pattern, `/{service}{route}`.
    pub pattern: PathPattern,
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub binding: RouteBinding,
    pub params: PathParams,
}

impl ResolvedRoute {
    pub fn service(&self) -> &ServiceDefinition {
        &self.binding.service
    }
}

/// Why a path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMiss {
    /// No service is registered under the first path segment.
    UnknownService { service: String },
    /// The service exists but none of its routes match.
    NoMatchingRoute { service: String, path: String },
}

/// Immutable route table built once at startup.
#[derive(Debug, Default)]
pub struct RouteTable {
    services: HashMap<String, Arc<ServiceDefinition>>,
    bindings: HashMap<String, Vec<RouteBinding>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from a configuration, failing fast on any invalid
    /// service, base URL or route.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        crate::config::validation::validate_config(config).map_err(ConfigError::Validation)?;

        let mut table = Self::new();
        for service_config in &config.services {
            let service = ServiceDefinition::from_config(service_config)
                .map(Arc::new)
                .map_err(|e| ConfigError::Validation(vec![e]))?;

            tracing::info!(
                service = %service.name,
                base_url = %service.upstream,
                "Registering service"
            );

            table.add_service(service.clone())?;
            for route in &service_config.routes {
                let binding = table.register(&service.name, &route.path)?;
                tracing::info!(path = %binding.pattern, "Registered route");
            }
        }

        Ok(table)
    }

    /// Add a service with no routes yet. Names must be unique.
    pub fn add_service(&mut self, service: Arc<ServiceDefinition>) -> Result<(), ConfigError> {
        if self.services.contains_key(&service.name) {
            return Err(ConfigError::Validation(vec![
                ValidationError::DuplicateService(service.name.clone()),
            ]));
        }
        self.bindings.entry(service.name.clone()).or_default();
        self.services.insert(service.name.clone(), service);
        Ok(())
    }

    /// Register `route` for an already added service at `/{service}{route}`.
    pub fn register(&mut self, service_name: &str, route: &str) -> Result<RouteBinding, ConfigError> {
        let service = self.services.get(service_name).cloned().ok_or_else(|| {
            ConfigError::Validation(vec![ValidationError::UnknownService(
                service_name.to_string(),
            )])
        })?;

        let full = format!("/{}{}", service_name, route);
        let pattern = PathPattern::parse(&full).map_err(|source| {
            ConfigError::Validation(vec![ValidationError::InvalidRoute {
                service: service_name.to_string(),
                path: route.to_string(),
                source,
            }])
        })?;

        let bindings = self.bindings.entry(service_name.to_string()).or_default();
        if bindings.iter().any(|b| b.pattern == pattern) {
            return Err(ConfigError::Validation(vec![
                ValidationError::DuplicateRoute {
                    service: service_name.to_string(),
                    path: route.to_string(),
                },
            ]));
        }

        let binding = RouteBinding {
            service,
            route: route.to_string(),
            pattern,
        };
        bindings.push(binding.clone());
        Ok(binding)
    }

    /// Find the binding serving `path`.
    pub fn resolve(&self, path: &str) -> Result<ResolvedRoute, RouteMiss> {
        let service = decode_segment(service_segment(path));
        let Some(bindings) = self.bindings.get(service.as_ref()) else {
            return Err(RouteMiss::UnknownService {
                service: service.to_string(),
            });
        };

        let mut best: Option<ResolvedRoute> = None;
        for binding in bindings {
            let Some(params) = binding.pattern.matches(path) else {
                continue;
            };
            let better = match &best {
                Some(current) => {
                    binding.pattern.specificity() > current.binding.pattern.specificity()
                }
                None => true,
            };
            if better {
                best = Some(ResolvedRoute {
                    binding: binding.clone(),
                    params,
                });
            }
        }

        best.ok_or_else(|| RouteMiss::NoMatchingRoute {
            service: service.to_string(),
            path: path.to_string(),
        })
    }
}

/// First path segment, i.e. the service name a path addresses.
pub fn service_segment(path: &str) -> &str {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split('/').next().unwrap_or_default()
}
