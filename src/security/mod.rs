//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved request:
//!     → auth.rs (pluggable allow/deny gate)
//!     → rate_limit.rs (per service + client fixed window)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-For)
//!     → Pass to proxy transport
//! ```
//!
//! # Design Decisions
//! - Auth runs before rate limiting so rejected requests cost nothing
//! - Rate-limit state is an injected component, not a global
//! - No trust in client input (X-Forwarded-For is opt-in)

pub mod auth;
pub mod headers;
pub mod rate_limit;

pub use auth::{AllowAll, AuthDecision, AuthGate};
pub use rate_limit::{
    Clock, ManualClock, RateDecision, RateLimitKey, RateLimiter, SystemClock, MAX_WINDOW,
};
