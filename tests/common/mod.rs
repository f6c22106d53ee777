//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_gateway::config::{GatewayConfig, RouteConfig, ServiceConfig};
use api_gateway::{HttpServer, Shutdown};
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

async fn serve_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("absent")
        .to_string()
}

/// Backend that answers `"<METHOD> <URI>\n<BODY>"` and reflects a few
/// request headers back as `x-echo-*` response headers.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
        (
            StatusCode::OK,
            [
                ("x-echo-forwarded-for", header(&headers, "x-forwarded-for")),
                ("x-echo-request-id", header(&headers, "x-request-id")),
                ("x-echo-custom", header(&headers, "x-custom")),
            ],
            format!("{} {}\n{}", method, uri, String::from_utf8_lossy(&body)),
        )
    }

    serve_backend(Router::new().fallback(echo)).await
}

/// Backend that always answers with `status` and an `x-backend` header.
pub async fn start_status_backend(status: StatusCode, body: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        (status, [("x-backend", "status-backend")], body)
    });
    serve_backend(app).await
}

/// Backend that waits `delay` before answering.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "slow"
    });
    serve_backend(app).await
}

/// Sets its flag when dropped.
pub struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Backend that waits `delay` before answering. The returned flags report
/// whether a handler was dropped before finishing and whether one finished.
pub async fn start_tracked_slow_backend(
    delay: Duration,
) -> (SocketAddr, Arc<AtomicBool>, Arc<AtomicBool>) {
    let dropped = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));

    let app = {
        let dropped = dropped.clone();
        let finished = finished.clone();
        Router::new().fallback(move || {
            let dropped = dropped.clone();
            let finished = finished.clone();
            async move {
                let guard = DropFlag(dropped);
                tokio::time::sleep(delay).await;
                finished.store(true, Ordering::SeqCst);
                std::mem::forget(guard);
                "slow"
            }
        })
    };

    (serve_backend(app).await, dropped, finished)
}

/// An address nothing is listening on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn service(name: &str, backend: SocketAddr, routes: &[&str]) -> ServiceConfig {
    ServiceConfig {
        name: name.into(),
        base_url: format!("http://{}", backend),
        routes: routes
            .iter()
            .map(|p| RouteConfig { path: p.to_string() })
            .collect(),
    }
}

pub fn gateway_config(services: Vec<ServiceConfig>, window_secs: u64, count: u32) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.rate_limit.window_secs = window_secs;
    config.rate_limit.count = count;
    config.services = services;
    config
}

/// A gateway serving on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_gateway(server: HttpServer) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, server_shutdown));

    TestGateway {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
