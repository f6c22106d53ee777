//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (service lookup on the first segment)
//!     → matcher.rs (evaluate path patterns, capture parameters)
//!     → Return: ResolvedRoute or RouteMiss
//!
//! Route Compilation (at startup):
//!     GatewayConfig.services[]
//!     → Parse base URLs into Upstream targets
//!     → Register `/{service}{route}` bindings
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::{PathParams, PathPattern};
pub use router::{ResolvedRoute, RouteBinding, RouteMiss, RouteTable, ServiceDefinition, Upstream};
