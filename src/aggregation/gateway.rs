//! Fan-out/fan-in over the configured dependencies.

use std::sync::Arc;

use futures_util::future::join_all;

use crate::aggregation::merge::Aggregate;
use crate::error::GatewayError;
use crate::observability::TraceContext;
use crate::upstream::{Dependency, Upstream};

/// Calls every dependency concurrently and merges the results.
#[derive(Clone)]
pub struct AggregationGateway {
    dependencies: Arc<[Dependency]>,
    upstream: Arc<dyn Upstream>,
}

impl AggregationGateway {
    pub fn new(dependencies: Vec<Dependency>, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            dependencies: dependencies.into(),
            upstream,
        }
    }

    /// Run one aggregation for the request identified by `trace`.
    ///
    /// Partial failures stay inside the returned [`Aggregate`]; only a
    /// total failure becomes an error.
    pub async fn handle(&self, trace: &TraceContext) -> Result<Aggregate, GatewayError> {
        // join_all polls every call concurrently and yields in input order.
        let calls = self
            .dependencies
            .iter()
            .map(|dependency| self.upstream.call(dependency, trace));
        let aggregate = Aggregate::new(join_all(calls).await);

        for result in aggregate.results() {
            if let Some(failure) = result.error() {
                tracing::warn!(
                    dependency = %result.source(),
                    error_kind = %failure.kind(),
                    detail = %failure.detail(),
                    upstream_status = ?failure.upstream_status(),
                    trace_id = %trace.trace_id,
                    span_id = %trace.span_id,
                    "Dependency call failed"
                );
            }
        }

        if aggregate.all_failed() {
            let error = GatewayError::AllDependenciesFailed {
                count: aggregate.results().len(),
                summary: aggregate.failure_summary(),
            };
            tracing::error!(
                error_kind = %error.kind(),
                trace_id = %trace.trace_id,
                span_id = %trace.span_id,
                error = %error,
                "Aggregation failed"
            );
            return Err(error);
        }

        tracing::debug!(
            dependencies = aggregate.results().len(),
            failed = aggregate.failed_count(),
            trace_id = %trace.trace_id,
            "Aggregation complete"
        );
        Ok(aggregate)
    }
}
