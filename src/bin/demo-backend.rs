//! Demo catalog services for local runs of the gateway.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use aggregation_gateway::backends::products::PricingLookup;
use aggregation_gateway::backends::{categories, pricing, products, RouteChaos};
use aggregation_gateway::chaos::ThreadRandom;
use aggregation_gateway::config::{LogFormat, ObservabilityConfig};
use aggregation_gateway::lifecycle::{spawn_signal_handler, Shutdown};
use aggregation_gateway::observability::logging;
use aggregation_gateway::upstream::UpstreamClient;

#[derive(Parser)]
#[command(name = "demo-backend")]
#[command(about = "Serve one of the demo catalogs the gateway aggregates", long_about = None)]
struct Cli {
    /// Full bind address; overrides `--port`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Port on all interfaces; defaults to the service's conventional port.
    #[arg(short, long, env = "APP_PORT")]
    port: Option<u16>,

    /// Serve without injected latency or failures.
    #[arg(long)]
    no_chaos: bool,

    /// Emit JSON logs.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand, Clone)]
enum Service {
    /// Category catalog (port 8081)
    Categories,
    /// Product pricing (port 8082)
    Pricing,
    /// Product catalog enriched from pricing (port 8083)
    Products {
        /// Base URL of the pricing service.
        #[arg(long, env = "PRICING_SERVICE_URL", default_value = "http://localhost:8082")]
        pricing_url: String,

        /// Timeout of each pricing call in milliseconds.
        #[arg(long, default_value_t = 2_000)]
        pricing_timeout_ms: u64,
    },
}

impl Service {
    fn name(&self) -> &'static str {
        match self {
            Service::Categories => "categories",
            Service::Pricing => "pricing",
            Service::Products { .. } => "products",
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            Service::Categories => 8081,
            Service::Pricing => 8082,
            Service::Products { .. } => 8083,
        }
    }
}

fn bind_address(bind: Option<String>, port: Option<u16>, service: &Service) -> String {
    bind.unwrap_or_else(|| format!("0.0.0.0:{}", port.unwrap_or(service.default_port())))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let name = cli.service.name();

    let observability = ObservabilityConfig {
        service_name: name.to_string(),
        log_format: if cli.json { LogFormat::Json } else { LogFormat::Pretty },
        ..ObservabilityConfig::default()
    };
    logging::init_logging(&observability, env!("CARGO_CRATE_NAME"))?;

    let chaos = RouteChaos::new(!cli.no_chaos, Arc::new(ThreadRandom));
    let router = match &cli.service {
        Service::Categories => categories::router(chaos),
        Service::Pricing => pricing::router(),
        Service::Products {
            pricing_url,
            pricing_timeout_ms,
        } => {
            let lookup = PricingLookup::new(
                pricing_url.clone(),
                Duration::from_millis(*pricing_timeout_ms),
                Arc::new(UpstreamClient::new()?),
            );
            products::router(chaos, lookup)
        }
    };

    let bind = bind_address(cli.bind, cli.port, &cli.service);
    let listener = TcpListener::bind(&bind).await?;
    tracing::info!(
        service = name,
        address = %listener.local_addr()?,
        chaos = !cli.no_chaos,
        "Demo backend listening"
    );

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    let mut stop = shutdown.subscribe();

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = stop.recv().await;
        })
        .await?;

    tracing::info!(service = name, "Demo backend stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_comes_from_flag_or_environment() {
        let cli = Cli::try_parse_from(["demo-backend", "--port", "9000", "pricing"]).unwrap();
        assert_eq!(bind_address(cli.bind, cli.port, &cli.service), "0.0.0.0:9000");

        let cli = Cli::try_parse_from(["demo-backend", "--bind", "127.0.0.1:7000", "--port", "9000", "categories"])
            .unwrap();
        assert_eq!(bind_address(cli.bind, cli.port, &cli.service), "127.0.0.1:7000");
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(bind_address(None, None, &Service::Categories), "0.0.0.0:8081");
        assert_eq!(bind_address(None, None, &Service::Pricing), "0.0.0.0:8082");
        let products = Service::Products {
            pricing_url: "http://localhost:8082".into(),
            pricing_timeout_ms: 2_000,
        };
        assert_eq!(bind_address(None, None, &products), "0.0.0.0:8083");
    }
}
