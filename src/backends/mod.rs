//! Demo catalog backends the gateway aggregates.
//!
//! # Data Flow
//! ```text
//! GET /categories, /products ...
//!     → trace context middleware (continues the gateway's trace)
//!     → chaos layer (per-route failure probability and latency)
//!     → handler over an in-memory Catalog
//!     → products only: GET /pricing/{ids} on the pricing service
//! ```
//!
//! # Design Decisions
//! - Data lives in a lock-guarded Catalog; writers are serialized
//! - Chaos can be switched off for deterministic runs

pub mod categories;
pub mod pricing;
pub mod products;
pub mod store;

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Router};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::chaos::{FaultInjectionLayer, FaultPolicy, RandomSource};
use crate::http::middleware::trace_context_middleware;
use crate::http::request::UuidRequestId;
use crate::observability::TracePropagator;

pub use store::Catalog;

/// Builds the fault layer of each backend route.
#[derive(Clone)]
pub struct RouteChaos {
    enabled: bool,
    random: Arc<dyn RandomSource>,
}

impl RouteChaos {
    pub fn new(enabled: bool, random: Arc<dyn RandomSource>) -> Self {
        Self { enabled, random }
    }

    pub fn layer(&self, route: &str, policy: FaultPolicy) -> FaultInjectionLayer {
        let policy = if self.enabled { policy } else { FaultPolicy::disabled() };
        FaultInjectionLayer::new(route, policy, Arc::clone(&self.random))
    }
}

/// Wrap a backend router in the same request ID and trace plumbing as the gateway.
pub fn with_service_layers(router: Router) -> Router {
    let propagator = Arc::new(TracePropagator::default());
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(from_fn_with_state(propagator, trace_context_middleware)),
    )
}

async fn health_handler() -> &'static str {
    "OK"
}
