//! Concurrent burst against a single client's rate-limit bucket.

use std::time::Duration;

use api_gateway::HttpServer;
use axum::http::StatusCode;
use futures_util::future::join_all;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_burst_admits_exactly_limit() {
    let backend = common::start_echo_backend().await;
    let limit = 5;
    let config = common::gateway_config(vec![common::service("orders", backend, &["/list"])], 60, limit);
    let gateway = common::start_gateway(HttpServer::new(config).unwrap()).await;

    let client = common::client();
    let url = gateway.url("/orders/list");
    let requests = (0..40).map(|_| {
        let client = client.clone();
        let url = url.clone();
        tokio::spawn(async move { client.get(&url).send().await.map(|r| r.status()) })
    });

    let statuses: Vec<StatusCode> = join_all(requests)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let limited = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .count();
    assert_eq!(ok, limit as usize);
    assert_eq!(limited, 40 - limit as usize);

    gateway.shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), gateway.handle).await;
}
