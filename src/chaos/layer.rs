//! Tower layer that applies a [`FaultPolicy`] in front of any service.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::chaos::policy::{FaultDecision, FaultPolicy};
use crate::chaos::random::RandomSource;
use crate::error::{ErrorKind, GatewayError};
use crate::observability::metrics;
use crate::observability::TraceContext;

/// Wraps services in [`FaultInjection`].
#[derive(Clone)]
pub struct FaultInjectionLayer {
    route: Arc<str>,
    policy: FaultPolicy,
    random: Arc<dyn RandomSource>,
}

impl FaultInjectionLayer {
    /// `route` names the wrapped route in logs and metrics.
    pub fn new(route: impl Into<Arc<str>>, policy: FaultPolicy, random: Arc<dyn RandomSource>) -> Self {
        Self {
            route: route.into(),
            policy,
            random,
        }
    }
}

impl<S> Layer<S> for FaultInjectionLayer {
    type Service = FaultInjection<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FaultInjection {
            inner,
            route: Arc::clone(&self.route),
            policy: self.policy,
            random: Arc::clone(&self.random),
        }
    }
}

/// Service that may reject or delay a request before the inner service sees it.
#[derive(Clone)]
pub struct FaultInjection<S> {
    inner: S,
    route: Arc<str>,
    policy: FaultPolicy,
    random: Arc<dyn RandomSource>,
}

impl<S, B> Service<Request<B>> for FaultInjection<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let decision = if self.policy.is_noop() {
            FaultDecision::Proceed(Duration::ZERO)
        } else {
            self.policy.decide(self.random.as_ref())
        };
        let route = Arc::clone(&self.route);

        // The ready service is the one we were polled with; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match decision {
                FaultDecision::Fail => {
                    match request.extensions().get::<TraceContext>() {
                        Some(trace) => tracing::warn!(
                            route = %route,
                            error_kind = %ErrorKind::InjectedFailure,
                            trace_id = %trace.trace_id,
                            span_id = %trace.span_id,
                            "Injected failure, handler skipped"
                        ),
                        None => tracing::warn!(
                            route = %route,
                            error_kind = %ErrorKind::InjectedFailure,
                            "Injected failure, handler skipped"
                        ),
                    }
                    metrics::record_injected_failure(&route);
                    Ok(GatewayError::InjectedFailure {
                        route: route.to_string(),
                    }
                    .into_response())
                }
                FaultDecision::Proceed(delay) => {
                    if !delay.is_zero() {
                        tracing::debug!(
                            route = %route,
                            delay_ms = delay.as_millis() as u64,
                            "Injecting latency"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    inner.call(request).await.map(IntoResponse::into_response)
                }
            }
        })
    }
}
