//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, trace context)
//! - Wrap chaos-enabled routes in fault injection
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    middleware::from_fn_with_state,
    response::Response,
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::aggregation::AggregationGateway;
use crate::chaos::{FaultInjectionLayer, RandomSource, ThreadRandom};
use crate::config::validation::min_request_timeout;
use crate::config::GatewayConfig;
use crate::http::middleware::trace_context_middleware;
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response::aggregate_response;
use crate::observability::metrics;
use crate::observability::{TraceContext, TracePropagator};
use crate::upstream::{Dependency, DependencyError, Upstream, UpstreamClient};

pub use crate::config::schema::{AGGREGATE_ROUTE, MIGHT_FAIL_ROUTE};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid dependency: {0}")]
    Dependency(#[from] DependencyError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AggregationGateway>,
}

/// HTTP server for the aggregation gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a server calling dependencies over HTTP.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let client = UpstreamClient::new()?;
        Self::with_upstream(config, Arc::new(client))
    }

    /// Create a server with a custom upstream (used to simulate dependencies).
    pub fn with_upstream(config: GatewayConfig, upstream: Arc<dyn Upstream>) -> Result<Self, ServerError> {
        Self::with_parts(config, upstream, Arc::new(ThreadRandom))
    }

    pub fn with_parts(
        config: GatewayConfig,
        upstream: Arc<dyn Upstream>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, ServerError> {
        let dependencies = config
            .dependencies
            .iter()
            .map(Dependency::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let state = AppState {
            gateway: Arc::new(AggregationGateway::new(dependencies, upstream)),
        };
        let propagator = Arc::new(TracePropagator::new(config.observability.sample_ratio));

        let router = Self::build_router(&config, state, propagator, random);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &GatewayConfig,
        state: AppState,
        propagator: Arc<TracePropagator>,
        random: Arc<dyn RandomSource>,
    ) -> Router {
        // Never cut a dependency short of its own budget.
        let request_timeout =
            Duration::from_millis(config.timeouts.request_ms).max(min_request_timeout(config));

        let aggregate_chaos = FaultInjectionLayer::new(
            AGGREGATE_ROUTE,
            config.chaos.policy_for(AGGREGATE_ROUTE),
            Arc::clone(&random),
        );
        let might_fail_chaos = FaultInjectionLayer::new(
            MIGHT_FAIL_ROUTE,
            config.chaos.policy_for(MIGHT_FAIL_ROUTE),
            random,
        );

        Router::new()
            .route("/aggregate", get(aggregate_handler).layer(aggregate_chaos.clone()))
            .route("/home", get(aggregate_handler).layer(aggregate_chaos))
            .route("/might-fail", get(might_fail_handler).layer(might_fail_chaos))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(request_timeout))
                    .layer(from_fn_with_state(propagator, trace_context_middleware)),
            )
    }

    /// The fully layered router; handy for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.observability.service_name,
            dependencies = self.config.dependencies.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Fan out to every dependency and merge the results.
async fn aggregate_handler(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceContext>,
    headers: HeaderMap,
) -> Response {
    let start_time = Instant::now();
    let span = tracing::info_span!(
        "aggregate",
        request_id = %request_id(&headers),
        trace_id = %trace.trace_id,
        span_id = %trace.span_id,
        sampled = trace.sampled,
    );

    let outcome = state.gateway.handle(&trace).instrument(span).await;
    let response = aggregate_response(outcome);

    metrics::record_request(AGGREGATE_ROUTE, response.status().as_u16(), start_time);
    response
}

async fn might_fail_handler() -> &'static str {
    "OK"
}

async fn health_handler() -> &'static str {
    "OK"
}
