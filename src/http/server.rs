//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the route table and rate limiter from configuration (fail fast)
//! - Create the Axum Router feeding every path to the dispatcher
//! - Wire up middleware (request ID, tracing, panic recovery)
//! - Serve with peer addresses and graceful shutdown

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response},
    response::IntoResponse,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::{ConfigError, GatewayConfig};
use crate::http::dispatcher::Dispatcher;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::GatewayError;
use crate::lifecycle::shutdown::recv_owned;
use crate::routing::RouteTable;
use crate::security::{AllowAll, AuthGate, Clock, RateLimiter, SystemClock};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a server with the default auth gate and the system clock.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn builder(config: GatewayConfig) -> HttpServerBuilder {
        HttpServerBuilder {
            config,
            auth: Arc::new(AllowAll),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch_handler))
            .route("/{*path}", any(dispatch_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(CatchPanicLayer::custom(handle_panic)),
            )
    }

    /// The fully layered router, for serving or driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = self
            .limiter
            .clone()
            .spawn_sweeper(self.config.rate_limit.window(), shutdown.resubscribe());

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(recv_owned(shutdown))
            .await;

        sweeper.abort();
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Builder for swapping the auth gate or clock before startup.
pub struct HttpServerBuilder {
    config: GatewayConfig,
    auth: Arc<dyn AuthGate>,
    clock: Arc<dyn Clock>,
}

impl HttpServerBuilder {
    pub fn auth_gate(mut self, auth: Arc<dyn AuthGate>) -> Self {
        self.auth = auth;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<HttpServer, ConfigError> {
        let routes = Arc::new(RouteTable::from_config(&self.config)?);
        let limiter = Arc::new(RateLimiter::new(self.clock));
        let dispatcher = Dispatcher::new(&self.config, routes, self.auth, limiter.clone());

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
        };

        Ok(HttpServer {
            router: HttpServer::build_router(state),
            config: Arc::new(self.config),
            limiter,
        })
    }
}

async fn dispatch_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    state.dispatcher.handle(peer, request).await
}

fn make_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id(request),
    )
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail = %detail, "Request handler panicked");
    GatewayError::Internal(detail.to_string()).into_response()
}
