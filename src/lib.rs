//! Configuration-driven API gateway library.
//!
//! Requests to `/{service}{route}` are matched against a route table built
//! from configuration, passed through a pluggable auth gate and a
//! per-client rate limiter, then reverse-proxied to the service's backend.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::{HttpServer, HttpServerBuilder};
pub use lifecycle::Shutdown;
