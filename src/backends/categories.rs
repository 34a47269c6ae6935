//! Category catalog service.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backends::{health_handler, with_service_layers, Catalog, RouteChaos};
use crate::chaos::FaultPolicy;
use crate::observability::TraceContext;

const LATENCY: (u64, u64) = (0, 300);
const LIST_POLICY: FaultPolicy = FaultPolicy::failing(0.05).with_latency(LATENCY.0, LATENCY.1);
const GET_POLICY: FaultPolicy = FaultPolicy::failing(0.02).with_latency(LATENCY.0, LATENCY.1);
const CREATE_POLICY: FaultPolicy = FaultPolicy::failing(0.05).with_latency(LATENCY.0, LATENCY.1);
const MIGHT_FAIL_POLICY: FaultPolicy = FaultPolicy::failing(0.3);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
}

fn seed() -> Vec<Category> {
    (1..=3)
        .map(|id| Category {
            id,
            name: format!("Category {}", id),
            description: format!("Description {}", id),
        })
        .collect()
}

/// Routes of the categories service, seeded with three categories.
pub fn router(chaos: RouteChaos) -> Router {
    let catalog = Arc::new(Catalog::new(seed()));

    let routes = Router::new()
        .route(
            "/categories",
            get(list_categories)
                .layer(chaos.layer("categories.list", LIST_POLICY))
                .merge(post(create_category).layer(chaos.layer("categories.create", CREATE_POLICY))),
        )
        .route(
            "/categories/{id}",
            get(get_category).layer(chaos.layer("categories.get", GET_POLICY)),
        )
        .route(
            "/might-fail",
            get(|| async { "Hello" }).layer(chaos.layer("categories.might_fail", MIGHT_FAIL_POLICY)),
        )
        .route("/health", get(health_handler))
        .with_state(catalog);

    with_service_layers(routes)
}

async fn list_categories(
    State(catalog): State<Arc<Catalog<Category>>>,
    Extension(trace): Extension<TraceContext>,
) -> Json<Vec<Category>> {
    let categories = catalog.list().await;
    tracing::info!(trace_id = %trace.trace_id, count = categories.len(), "Listing categories");
    Json(categories)
}

async fn get_category(
    State(catalog): State<Arc<Catalog<Category>>>,
    Path(id): Path<String>,
) -> Response {
    let found = match id.parse::<u64>() {
        Ok(id) => catalog.find(|c| c.id == id).await,
        Err(_) => None,
    };
    match found {
        Some(category) => Json(category).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Category not found" }))).into_response(),
    }
}

/// Responds with the whole catalog after the insert.
async fn create_category(
    State(catalog): State<Arc<Catalog<Category>>>,
    Json(new): Json<NewCategory>,
) -> Json<Vec<Category>> {
    let category = catalog
        .insert_with(|existing| Category {
            id: existing.iter().map(|c| c.id).max().unwrap_or(0) + 1,
            name: new.name,
            description: new.description,
        })
        .await;
    tracing::info!(id = category.id, name = %category.name, "Category created");
    Json(catalog.list().await)
}
