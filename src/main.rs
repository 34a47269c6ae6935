//! Aggregation gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │               AGGREGATION GATEWAY            │
//!   Client Request        │  ┌─────────────┐   ┌───────┐   ┌───────────┐ │
//!   ──────────────────────┼─▶│ http server │──▶│ chaos │──▶│ aggregate │ │
//!   (traceparent?)        │  │ + trace ctx │   │ layer │   │  handler  │ │
//!                         │  └─────────────┘   └───────┘   └─────┬─────┘ │
//!                         │                                      │       │     ┌────────────┐
//!                         │                      ┌───────────────┼───────┼────▶│ categories │
//!                         │                      │  upstream     │       │     └────────────┘
//!                         │                      │  client       ▼       │     ┌────────────┐
//!                         │                      │  (traceparent out) ───┼────▶│  pricing   │
//!   Client Response       │  ┌─────────────┐     └───────────────────────┤     └────────────┘
//!   ◀─────────────────────┼──│    merge    │◀──── results in order ──────┘
//!                         │  └─────────────┘                             │
//!                         │  config · logging · metrics · lifecycle      │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use aggregation_gateway::config::load_config;
use aggregation_gateway::http::GatewayServer;
use aggregation_gateway::lifecycle::{spawn_signal_handler, Shutdown};
use aggregation_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "aggregation-gateway")]
#[command(about = "Fans one request out to every dependency and merges the answers", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability, env!("CARGO_CRATE_NAME"))?;
    tracing::info!(
        service = %config.observability.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "aggregation-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        dependencies = ?config.dependencies.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        request_timeout_ms = config.timeouts.request_ms,
        chaos_enabled = config.chaos.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to parse metrics address"),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = GatewayServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
