//! HTTP client for dependency calls.
//!
//! # Responsibilities
//! - GET the dependency endpoint with `traceparent` attached
//! - Enforce the dependency's timeout over the whole exchange
//! - Classify failures as Timeout, UpstreamError or DecodeError

use std::time::Instant;

use axum::http::HeaderMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use crate::error::UpstreamFailure;
use crate::observability::metrics;
use crate::observability::{inject, TraceContext};
use crate::upstream::dependency::Dependency;
use crate::upstream::result::AggregatedResult;
use crate::upstream::Upstream;

/// Longest upstream error body echoed into a failure detail.
const MAX_ERROR_BODY: usize = 256;

/// Calls dependencies over HTTP. Cheap to clone; clones share one pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("aggregation-gateway/", env!("CARGO_PKG_VERSION")))
            // Dependencies are addressed directly, never through an env proxy.
            .no_proxy()
            .build()?;
        Ok(Self { http })
    }

    /// Call one dependency. Always resolves; failures are embedded in the result.
    pub async fn call(&self, dependency: &Dependency, trace: &TraceContext) -> AggregatedResult {
        let start = Instant::now();

        let outcome = match tokio::time::timeout(dependency.timeout(), self.fetch(dependency, trace)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(UpstreamFailure::timeout(dependency.timeout())),
        };

        let label = match &outcome {
            Ok(_) => "ok",
            Err(failure) => failure.kind().as_str(),
        };
        metrics::record_upstream_call(dependency.name(), label, start);

        if outcome.is_ok() {
            tracing::debug!(
                dependency = %dependency.name(),
                trace_id = %trace.trace_id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Dependency call succeeded"
            );
        }

        AggregatedResult::new(dependency.name(), outcome)
    }

    async fn fetch(&self, dependency: &Dependency, trace: &TraceContext) -> Result<Value, UpstreamFailure> {
        let mut headers = HeaderMap::new();
        inject(trace, &mut headers);

        let response = self
            .http
            .get(dependency.endpoint().clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify(dependency, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamFailure::status(status.as_u16(), truncate(&body)));
        }

        let body = response.bytes().await.map_err(|e| classify(dependency, e))?;
        let payload: Value = serde_json::from_slice(&body)
            .map_err(|e| UpstreamFailure::decode(format!("invalid JSON payload: {}", e)))?;

        if !dependency.expect().matches(&payload) {
            return Err(UpstreamFailure::decode(format!(
                "expected {} payload, got {}",
                dependency.expect().as_str(),
                json_kind(&payload)
            )));
        }

        Ok(payload)
    }
}

impl Upstream for UpstreamClient {
    fn call<'a>(
        &'a self,
        dependency: &'a Dependency,
        trace: &'a TraceContext,
    ) -> BoxFuture<'a, AggregatedResult> {
        UpstreamClient::call(self, dependency, trace).boxed()
    }
}

fn classify(dependency: &Dependency, error: reqwest::Error) -> UpstreamFailure {
    if error.is_timeout() {
        return UpstreamFailure::timeout(dependency.timeout());
    }
    let kind = if error.is_connect() {
        "connection failed"
    } else if error.is_body() || error.is_decode() {
        "failed to read response body"
    } else {
        "request failed"
    };
    UpstreamFailure::transport(format!("{}: {}", kind, error))
}

fn truncate(body: &str) -> &str {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let short = "bad gateway";
        assert_eq!(truncate(short), short);

        let long = "é".repeat(200);
        let cut = truncate(&long);
        assert!(cut.len() <= MAX_ERROR_BODY);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_json_kind_names() {
        assert_eq!(json_kind(&serde_json::json!({})), "object");
        assert_eq!(json_kind(&serde_json::json!([])), "array");
        assert_eq!(json_kind(&serde_json::json!(1)), "number");
    }
}
