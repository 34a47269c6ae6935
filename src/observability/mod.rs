//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → propagation.rs (extract or start a W3C trace context)
//!     → logging.rs (structured events carrying trace and request ids)
//!     → metrics.rs (request, upstream and chaos counters and histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Next hop (traceparent header)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace context is passed explicitly, not kept in a global
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;
pub mod propagation;

pub use propagation::{inject, SpanId, TraceContext, TraceId, TracePropagator, TRACEPARENT};
