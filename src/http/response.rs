//! Response mapping.
//!
//! # Responsibilities
//! - Render a merged aggregate as a 200 JSON response
//! - Map gateway errors to status codes (see `GatewayError`)
//!
//! # Design Decisions
//! - Partial failures stay 200; only a total failure becomes 502

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::aggregation::Aggregate;
use crate::error::GatewayError;

impl IntoResponse for Aggregate {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response for one aggregation outcome.
pub fn aggregate_response(outcome: Result<Aggregate, GatewayError>) -> Response {
    match outcome {
        Ok(aggregate) => aggregate.into_response(),
        Err(error) => error.into_response(),
    }
}
