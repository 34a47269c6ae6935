//! Pricing catalog service. Serves without fault injection.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::backends::{health_handler, with_service_layers, Catalog};
use crate::observability::TraceContext;

/// Price of one product. `total` is derived from `price` and `discount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPricing {
    pub product_id: String,
    pub price: f64,
    pub discount: f64,
    pub total: f64,
}

impl ProductPricing {
    pub fn new(product_id: impl Into<String>, price: f64, discount: f64) -> Self {
        Self {
            product_id: product_id.into(),
            price,
            discount,
            total: price * (1.0 - discount),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPricing {
    pub product_id: String,
    pub price: f64,
    #[serde(default)]
    pub discount: Option<f64>,
}

fn seed() -> Vec<ProductPricing> {
    vec![
        ProductPricing::new("1", 100.0, 0.0),
        ProductPricing::new("2", 200.0, 0.0),
        ProductPricing::new("3", 300.0, 0.0),
        ProductPricing::new("4", 400.0, 0.1),
        ProductPricing::new("5", 500.0, 0.15),
    ]
}

/// Routes of the pricing service, seeded with five prices.
pub fn router() -> Router {
    let catalog = Arc::new(Catalog::new(seed()));

    let routes = Router::new()
        .route("/pricing", get(list_prices).post(add_price))
        .route("/pricing/{product_ids}", get(prices_for_products))
        .route("/health", get(health_handler))
        .with_state(catalog);

    with_service_layers(routes)
}

async fn list_prices(
    State(catalog): State<Arc<Catalog<ProductPricing>>>,
    Extension(trace): Extension<TraceContext>,
) -> Json<Vec<ProductPricing>> {
    let prices = catalog.list().await;
    tracing::info!(trace_id = %trace.trace_id, count = prices.len(), "Listing prices");
    Json(prices)
}

/// `product_ids` is a comma-separated list; unknown ids are skipped.
async fn prices_for_products(
    State(catalog): State<Arc<Catalog<ProductPricing>>>,
    Path(product_ids): Path<String>,
) -> Json<Vec<ProductPricing>> {
    let wanted: HashSet<&str> = product_ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    Json(catalog.filter(|p| wanted.contains(p.product_id.as_str())).await)
}

async fn add_price(
    State(catalog): State<Arc<Catalog<ProductPricing>>>,
    Json(new): Json<NewPricing>,
) -> Json<ProductPricing> {
    let pricing = catalog
        .insert_with(|_| ProductPricing::new(new.product_id, new.price, new.discount.unwrap_or(0.0)))
        .await;
    tracing::info!(product_id = %pricing.product_id, total = pricing.total, "Added new price");
    Json(pricing)
}
