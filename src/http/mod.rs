//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, peer address)
//!     → request.rs (request ID)
//!     → dispatcher.rs (route → auth → rate limit)
//!     → proxy.rs (forward to backend, stream response)
//!     → response.rs (gateway-side failures as status codes)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::X_REQUEST_ID;
pub use response::GatewayError;
pub use server::{HttpServer, HttpServerBuilder};
