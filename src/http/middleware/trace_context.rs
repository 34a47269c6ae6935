//! Trace context middleware.
//! Extracts or starts the request's trace and hands it to handlers.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::observability::TracePropagator;

/// Insert this hop's [`TraceContext`](crate::observability::TraceContext)
/// into the request extensions.
pub async fn trace_context_middleware(
    State(propagator): State<Arc<TracePropagator>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let trace = propagator.extract_or_create(request.headers());
    request.extensions_mut().insert(trace);
    next.run(request).await
}
