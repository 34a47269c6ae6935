//! Product catalog service.
//!
//! # Data Flow
//! ```text
//! GET /products, /products/{id}
//!     → catalog lookup
//!     → pricing.rs (GET {pricing}/pricing/{ids}, traceparent of this hop)
//!     → products enriched with their pricing entry
//! ```
//!
//! # Design Decisions
//! - The pricing call goes through the same upstream client as the gateway,
//!   so the trace started at the gateway continues one hop further
//! - A product without a price is an error, not a partial answer

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::backends::pricing::ProductPricing;
use crate::backends::{health_handler, with_service_layers, Catalog, RouteChaos};
use crate::chaos::FaultPolicy;
use crate::error::UpstreamFailure;
use crate::observability::TraceContext;
use crate::upstream::{Dependency, DependencyError, PayloadKind, Upstream};

const LIST_POLICY: FaultPolicy = FaultPolicy::failing(0.1).with_latency(0, 500);
const GET_POLICY: FaultPolicy = FaultPolicy::failing(0.1).with_latency(0, 200);
const CREATE_POLICY: FaultPolicy = FaultPolicy::failing(0.2).with_latency(0, 300);
const MIGHT_FAIL_POLICY: FaultPolicy = FaultPolicy::failing(0.1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
}

/// A product together with its pricing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetails {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub pricing: ProductPricing,
}

#[derive(Debug, Error)]
pub enum PricingLookupError {
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("pricing call failed: {0}")]
    Upstream(UpstreamFailure),

    #[error("invalid pricing payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("price not found for product {0}")]
    MissingPrice(u64),
}

/// Fetches prices from the pricing service.
#[derive(Clone)]
pub struct PricingLookup {
    base_url: String,
    timeout: Duration,
    upstream: Arc<dyn Upstream>,
}

impl PricingLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            upstream,
        }
    }

    /// Prices keyed by product id, fetched in one call.
    pub async fn prices(
        &self,
        ids: &[u64],
        trace: &TraceContext,
    ) -> Result<HashMap<String, ProductPricing>, PricingLookupError> {
        let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
        let path = format!("/pricing/{}", ids.join(","));
        let dependency =
            Dependency::new("pricing", &self.base_url, &path, self.timeout)?.expecting(PayloadKind::Array);

        tracing::debug!(
            products = %ids.join(","),
            trace_id = %trace.trace_id,
            span_id = %trace.span_id,
            "Fetching prices"
        );
        let payload = self
            .upstream
            .call(&dependency, trace)
            .await
            .into_outcome()
            .map_err(PricingLookupError::Upstream)?;

        let prices: Vec<ProductPricing> = serde_json::from_value(payload)?;
        Ok(prices
            .into_iter()
            .map(|p| (p.product_id.clone(), p))
            .collect())
    }

    async fn enrich(
        &self,
        products: Vec<Product>,
        trace: &TraceContext,
    ) -> Result<Vec<ProductDetails>, PricingLookupError> {
        let ids: Vec<u64> = products.iter().map(|p| p.id).collect();
        let mut prices = self.prices(&ids, trace).await?;

        products
            .into_iter()
            .map(|product| {
                let pricing = prices
                    .remove(&product.id.to_string())
                    .ok_or(PricingLookupError::MissingPrice(product.id))?;
                Ok(ProductDetails {
                    id: product.id,
                    name: product.name,
                    description: product.description,
                    pricing,
                })
            })
            .collect()
    }
}

#[derive(Clone)]
struct ProductsState {
    catalog: Arc<Catalog<Product>>,
    pricing: PricingLookup,
}

fn seed() -> Vec<Product> {
    (1..=3)
        .map(|id| Product {
            id,
            name: format!("Product {}", id),
            description: format!("Description {}", id),
        })
        .collect()
}

/// Routes of the products service, seeded with three products.
pub fn router(chaos: RouteChaos, pricing: PricingLookup) -> Router {
    let state = ProductsState {
        catalog: Arc::new(Catalog::new(seed())),
        pricing,
    };

    let routes = Router::new()
        .route(
            "/products",
            get(list_products)
                .layer(chaos.layer("products.list", LIST_POLICY))
                .merge(post(create_product).layer(chaos.layer("products.create", CREATE_POLICY))),
        )
        .route(
            "/products/{id}",
            get(get_product).layer(chaos.layer("products.get", GET_POLICY)),
        )
        .route(
            "/might-fail",
            get(|| async { "Hello, World!" }).layer(chaos.layer("products.might_fail", MIGHT_FAIL_POLICY)),
        )
        .route("/health", get(health_handler))
        .with_state(state);

    with_service_layers(routes)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = json!({ "message": message.into(), "status": status.as_u16() });
    (status, Json(body)).into_response()
}

fn lookup_failed(error: PricingLookupError, trace: &TraceContext) -> Response {
    tracing::warn!(
        error = %error,
        trace_id = %trace.trace_id,
        span_id = %trace.span_id,
        "Pricing lookup failed"
    );
    error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

async fn list_products(
    State(state): State<ProductsState>,
    Extension(trace): Extension<TraceContext>,
) -> Response {
    let products = state.catalog.list().await;
    match state.pricing.enrich(products, &trace).await {
        Ok(details) => {
            tracing::info!(trace_id = %trace.trace_id, count = details.len(), "Listing products");
            Json(details).into_response()
        }
        Err(e) => lookup_failed(e, &trace),
    }
}

async fn get_product(
    State(state): State<ProductsState>,
    Extension(trace): Extension<TraceContext>,
    Path(id): Path<String>,
) -> Response {
    let found = match id.parse::<u64>() {
        Ok(id) => state.catalog.find(|p| p.id == id).await,
        Err(_) => None,
    };
    let Some(product) = found else {
        return error_response(StatusCode::NOT_FOUND, "product not found");
    };

    match state.pricing.enrich(vec![product], &trace).await {
        Ok(mut details) => match details.pop() {
            Some(detail) => Json(detail).into_response(),
            None => error_response(StatusCode::NOT_FOUND, "product not found"),
        },
        Err(e) => lookup_failed(e, &trace),
    }
}

async fn create_product(
    State(state): State<ProductsState>,
    Json(new): Json<NewProduct>,
) -> Json<Product> {
    let product = state
        .catalog
        .insert_with(|existing| Product {
            id: existing.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            name: new.name,
            description: new.description,
        })
        .await;
    tracing::info!(id = product.id, name = %product.name, "Product created");
    Json(product)
}
