//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use aggregation_gateway::chaos::{RandomSource, ThreadRandom};
use aggregation_gateway::config::{DependencyConfig, GatewayConfig};
use aggregation_gateway::http::GatewayServer;
use aggregation_gateway::lifecycle::Shutdown;
use aggregation_gateway::upstream::UpstreamClient;
use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port.
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Gateway config with chaos off and one dependency per `(name, addr, path)`.
pub fn gateway_config(dependencies: &[(&str, SocketAddr, &str)]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.chaos.enabled = false;
    config.observability.metrics_enabled = false;
    config.dependencies = dependencies
        .iter()
        .map(|(name, addr, path)| {
            DependencyConfig::new(name, &format!("http://{}", addr), path).with_timeout_ms(500)
        })
        .collect();
    config
}

/// Run a gateway on an ephemeral port. Dropping the `Shutdown` stops it.
pub async fn spawn_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    spawn_gateway_with_random(config, Arc::new(ThreadRandom)).await
}

#[allow(dead_code)]
pub async fn spawn_gateway_with_random(
    config: GatewayConfig,
    random: Arc<dyn RandomSource>,
) -> (SocketAddr, Shutdown) {
    let upstream = Arc::new(UpstreamClient::new().unwrap());
    let server = GatewayServer::with_parts(config, upstream, random).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
