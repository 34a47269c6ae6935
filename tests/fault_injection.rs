//! Fault injection over real sockets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use aggregation_gateway::backends::{categories, pricing, RouteChaos};
use aggregation_gateway::chaos::{FaultPolicy, RandomSource};

mod common;

/// Every draw returns `unit`; latency draws pick the minimum.
struct FixedDraw {
    unit: f64,
}

impl RandomSource for FixedDraw {
    fn unit(&self) -> f64 {
        self.unit
    }

    fn latency_ms(&self, min: u64, _max: u64) -> u64 {
        min
    }
}

async fn counting_backend(hits: Arc<AtomicUsize>) -> std::net::SocketAddr {
    let router = Router::new().route(
        "/categories",
        get(move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!([]))
            }
        }),
    );
    common::spawn_router(router).await
}

#[tokio::test]
async fn test_might_fail_follows_the_draw() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = counting_backend(hits.clone()).await;

    let mut config = common::gateway_config(&[("categories", addr, "/categories")]);
    config.chaos.enabled = true;
    config.chaos.routes.insert("might_fail".into(), FaultPolicy::failing(0.5));

    // 0.3 < 0.5: the call is failed.
    let (failing, _f) = common::spawn_gateway_with_random(config.clone(), Arc::new(FixedDraw { unit: 0.3 })).await;
    let response = common::client()
        .get(format!("http://{}/might-fail", failing))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Internal Server Error" }));

    // 0.7 >= 0.5: the handler answers.
    let (passing, _p) = common::spawn_gateway_with_random(config, Arc::new(FixedDraw { unit: 0.7 })).await;
    let response = common::client()
        .get(format!("http://{}/might-fail", passing))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    // Neither request touches a dependency.
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_injected_aggregate_failure_skips_fan_out() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = counting_backend(hits.clone()).await;

    let mut config = common::gateway_config(&[("categories", addr, "/categories")]);
    config.chaos.enabled = true;
    config.chaos.routes.insert("aggregate".into(), FaultPolicy::failing(1.0));
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    for _ in 0..5 {
        let response = common::client()
            .get(format!("http://{}/aggregate", gateway))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let response = common::client()
        .get(format!("http://{}/health", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_backend_failures_surface_as_sections() {
    // A zero draw fails every backend route with a non-zero probability.
    let chaos = RouteChaos::new(true, Arc::new(FixedDraw { unit: 0.0 }));
    let categories_addr = common::spawn_router(categories::router(chaos)).await;
    let pricing_addr = common::spawn_router(pricing::router()).await;

    let config = common::gateway_config(&[
        ("categories", categories_addr, "/categories"),
        ("pricing", pricing_addr, "/pricing"),
    ]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let response = common::client()
        .get(format!("http://{}/aggregate", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["categories"]["error"], "UpstreamError");
    assert_eq!(
        body["categories"]["detail"],
        r#"upstream responded with status 500: {"error":"Internal Server Error"}"#
    );
    assert_eq!(body["pricing"].as_array().unwrap().len(), 5);

    // Health stays outside the chaos layer.
    let response = common::client()
        .get(format!("http://{}/health", categories_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "OK");
}
