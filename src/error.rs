//! Error taxonomy shared by the gateway, the upstream client and the
//! fault-injection middleware.
//!
//! # Design Decisions
//! - Per-dependency failures are values ([`UpstreamFailure`]) embedded in the
//!   aggregate, never propagated with `?` out of the fan-out
//! - Only gateway-level outcomes become [`GatewayError`] and an HTTP error
//! - Error bodies are JSON: `{"error": ..., "detail": ...}`

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Kind of failure, as reported in logs, metrics and response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Deliberate chaos from the fault-injection middleware.
    InjectedFailure,
    /// A dependency exceeded its time budget.
    Timeout,
    /// Transport error or non-success status from a dependency.
    UpstreamError,
    /// The dependency answered, but the payload had the wrong shape.
    DecodeError,
    /// Every dependency of an aggregate failed.
    AllDependenciesFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InjectedFailure => "InjectedFailure",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::UpstreamError => "UpstreamError",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::AllDependenciesFailed => "AllDependenciesFailed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single dependency call.
///
/// Serializes to the section embedded in an aggregate response:
/// `{"error": "<ErrorKind>", "detail": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {detail}")]
pub struct UpstreamFailure {
    #[serde(rename = "error")]
    kind: ErrorKind,
    detail: String,
    #[serde(skip)]
    status: Option<u16>,
}

impl UpstreamFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            status: None,
        }
    }

    pub fn timeout(budget: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response within {}ms", budget.as_millis()),
        )
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamError, message)
    }

    /// Non-success HTTP status from the dependency.
    pub fn status(status: u16, message: impl AsRef<str>) -> Self {
        let message = message.as_ref().trim();
        let detail = if message.is_empty() {
            format!("upstream responded with status {}", status)
        } else {
            format!("upstream responded with status {}: {}", status, message)
        };
        Self {
            kind: ErrorKind::UpstreamError,
            detail,
            status: Some(status),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeError, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Upstream HTTP status, when the failure came from a response.
    pub fn upstream_status(&self) -> Option<u16> {
        self.status
    }
}

/// Gateway-level failures that replace the whole response.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("injected failure on route {route}")]
    InjectedFailure { route: String },

    #[error("all {count} dependencies failed: {summary}")]
    AllDependenciesFailed { count: usize, summary: String },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InjectedFailure { .. } => ErrorKind::InjectedFailure,
            GatewayError::AllDependenciesFailed { .. } => ErrorKind::AllDependenciesFailed,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InjectedFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::AllDependenciesFailed { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            // Generic payload; chaos is not advertised to callers.
            GatewayError::InjectedFailure { .. } => json!({ "error": "Internal Server Error" }),
            GatewayError::AllDependenciesFailed { .. } => json!({
                "error": self.kind().as_str(),
                "detail": self.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
