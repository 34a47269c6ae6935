//! End-to-end aggregation over real HTTP dependencies.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use aggregation_gateway::backends::products::PricingLookup;
use aggregation_gateway::backends::{categories, pricing, products, RouteChaos};
use aggregation_gateway::chaos::ThreadRandom;
use aggregation_gateway::upstream::UpstreamClient;

mod common;

fn json_backend(path: &str, payload: Value) -> Router {
    Router::new().route(
        path,
        get(move || {
            let payload = payload.clone();
            async move { Json(payload) }
        }),
    )
}

#[tokio::test]
async fn test_sections_follow_declaration_order() {
    // The first dependency answers last.
    let slow = Router::new().route(
        "/categories",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            Json(json!([{ "id": 1 }]))
        }),
    );
    let slow_addr = common::spawn_router(slow).await;
    let fast_addr = common::spawn_router(json_backend("/pricing", json!([{ "productId": "1" }]))).await;

    let config = common::gateway_config(&[
        ("categories", slow_addr, "/categories"),
        ("pricing", fast_addr, "/pricing"),
    ]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let response = common::client()
        .get(format!("http://{}/aggregate", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"categories":[{"id":1}],"pricing":[{"productId":"1"}]}"#
    );
}

#[tokio::test]
async fn test_slow_dependency_times_out_alone() {
    let hang = Router::new().route(
        "/pricing",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let hang_addr = common::spawn_router(hang).await;
    let ok_addr = common::spawn_router(json_backend("/categories", json!(["books"]))).await;

    let config = common::gateway_config(&[
        ("categories", ok_addr, "/categories"),
        ("pricing", hang_addr, "/pricing"),
    ]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let started = std::time::Instant::now();
    let response = common::client()
        .get(format!("http://{}/home", gateway))
        .send()
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["categories"], json!(["books"]));
    assert_eq!(body["pricing"]["error"], "Timeout");
    assert_eq!(body["pricing"]["detail"], "no response within 500ms");
}

#[tokio::test]
async fn test_request_timeout_equal_to_dependency_timeout_keeps_partial_result() {
    let hang = Router::new().route(
        "/pricing",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let hang_addr = common::spawn_router(hang).await;
    let ok_addr = common::spawn_router(json_backend("/categories", json!(["books"]))).await;

    let mut config = common::gateway_config(&[
        ("categories", ok_addr, "/categories"),
        ("pricing", hang_addr, "/pricing"),
    ]);
    config.timeouts.request_ms = 500;
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    for _ in 0..3 {
        let response = common::client()
            .get(format!("http://{}/aggregate", gateway))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["categories"], json!(["books"]));
        assert_eq!(body["pricing"]["error"], "Timeout");
    }
}

#[tokio::test]
async fn test_status_and_decode_failures_are_classified() {
    let broken = Router::new()
        .route("/categories", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }))
        .route("/pricing", get(|| async { "not json" }));
    let addr = common::spawn_router(broken).await;
    let ok_addr = common::spawn_router(json_backend("/stock", json!({ "count": 3 }))).await;

    let config = common::gateway_config(&[
        ("categories", addr, "/categories"),
        ("pricing", addr, "/pricing"),
        ("stock", ok_addr, "/stock"),
    ]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let body: Value = common::client()
        .get(format!("http://{}/aggregate", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["categories"]["error"], "UpstreamError");
    assert_eq!(
        body["categories"]["detail"],
        "upstream responded with status 503: down for maintenance"
    );
    assert_eq!(body["pricing"]["error"], "DecodeError");
    assert_eq!(body["stock"], json!({ "count": 3 }));
}

#[tokio::test]
async fn test_every_dependency_unreachable_is_bad_gateway() {
    let config = common::gateway_config(&[
        ("categories", common::closed_port().await, "/categories"),
        ("pricing", common::closed_port().await, "/pricing"),
    ]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let response = common::client()
        .get(format!("http://{}/aggregate", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "AllDependenciesFailed");
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("categories (UpstreamError)"), "{}", detail);
    assert!(detail.contains("pricing (UpstreamError)"), "{}", detail);
}

#[tokio::test]
async fn test_traceparent_is_continued_downstream() {
    let captured: Arc<Mutex<Vec<String>>> = Arc::default();
    let recorder = Router::new()
        .route(
            "/categories",
            get(|State(seen): State<Arc<Mutex<Vec<String>>>>, headers: HeaderMap| async move {
                if let Some(value) = headers.get("traceparent") {
                    seen.lock().unwrap().push(value.to_str().unwrap().to_string());
                }
                Json(json!([]))
            }),
        )
        .with_state(captured.clone());
    let addr = common::spawn_router(recorder).await;

    let config = common::gateway_config(&[("categories", addr, "/categories")]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let parent = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
    let response = common::client()
        .get(format!("http://{}/aggregate", gateway))
        .header("traceparent", parent)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = captured.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let fields: Vec<&str> = seen[0].split('-').collect();
    assert_eq!(fields[0], "00");
    assert_eq!(fields[1], "0af7651916cd43dd8448eb211c80319c");
    assert_ne!(fields[2], "b7ad6b7169203331");
    assert_eq!(fields[3], "01");
}

#[tokio::test]
async fn test_malformed_traceparent_starts_new_trace() {
    let captured: Arc<Mutex<Vec<String>>> = Arc::default();
    let recorder = Router::new()
        .route(
            "/categories",
            get(|State(seen): State<Arc<Mutex<Vec<String>>>>, headers: HeaderMap| async move {
                if let Some(value) = headers.get("traceparent") {
                    seen.lock().unwrap().push(value.to_str().unwrap().to_string());
                }
                Json(json!([]))
            }),
        )
        .with_state(captured.clone());
    let addr = common::spawn_router(recorder).await;

    let config = common::gateway_config(&[("categories", addr, "/categories")]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let response = common::client()
        .get(format!("http://{}/aggregate", gateway))
        .header("traceparent", "garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = captured.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 55);
    assert!(seen[0].starts_with("00-"));
}

#[tokio::test]
async fn test_gateway_over_demo_backends() {
    let quiet = RouteChaos::new(false, Arc::new(ThreadRandom));
    let categories_addr = common::spawn_router(categories::router(quiet)).await;
    let pricing_addr = common::spawn_router(pricing::router()).await;

    let config = common::gateway_config(&[
        ("categories", categories_addr, "/categories"),
        ("pricing", pricing_addr, "/pricing"),
    ]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let body: Value = common::client()
        .get(format!("http://{}/aggregate", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["categories"].as_array().unwrap().len(), 3);
    assert_eq!(body["categories"][0]["name"], "Category 1");
    assert_eq!(body["pricing"].as_array().unwrap().len(), 5);
    assert_eq!(body["pricing"][4]["productId"], "5");
}

#[tokio::test]
async fn test_one_trace_spans_gateway_products_and_pricing() {
    // Record the traceparent each pricing request arrives with.
    let captured: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen = captured.clone();
    let pricing = pricing::router().layer(axum::middleware::from_fn(
        move |request: axum::extract::Request, next: axum::middleware::Next| {
            let seen = seen.clone();
            async move {
                if let Some(value) = request.headers().get("traceparent") {
                    seen.lock().unwrap().push(value.to_str().unwrap().to_string());
                }
                next.run(request).await
            }
        },
    ));
    let pricing_addr = common::spawn_router(pricing).await;

    let quiet = RouteChaos::new(false, Arc::new(ThreadRandom));
    let lookup = PricingLookup::new(
        format!("http://{}", pricing_addr),
        Duration::from_millis(500),
        Arc::new(UpstreamClient::new().unwrap()),
    );
    let products_addr = common::spawn_router(products::router(quiet.clone(), lookup)).await;
    let categories_addr = common::spawn_router(categories::router(quiet)).await;

    let config = common::gateway_config(&[
        ("products", products_addr, "/products"),
        ("categories", categories_addr, "/categories"),
    ]);
    let (gateway, _shutdown) = common::spawn_gateway(config).await;

    let parent = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
    let response = common::client()
        .get(format!("http://{}/home", gateway))
        .header("traceparent", parent)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["products"].as_array().unwrap().len(), 3);
    assert_eq!(body["products"][1]["pricing"]["productId"], "2");
    assert_eq!(body["products"][1]["pricing"]["total"], 200.0);
    assert_eq!(body["categories"].as_array().unwrap().len(), 3);

    let seen = captured.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let fields: Vec<&str> = seen[0].split('-').collect();
    assert_eq!(fields[1], "0af7651916cd43dd8448eb211c80319c");
    assert_ne!(fields[2], "b7ad6b7169203331");
    assert_eq!(fields[3], "01");
}
