//! Upstream dependency calls.
//!
//! # Data Flow
//! ```text
//! AggregationGateway
//!     → Upstream::call(dependency, trace)
//!         → client.rs (GET endpoint, traceparent injected, timeout applied)
//!         → result.rs (AggregatedResult: payload XOR failure)
//! ```
//!
//! # Design Decisions
//! - A call never fails the caller; every outcome is an `AggregatedResult`
//! - Each dependency carries its own timeout
//! - The [`Upstream`] trait is the seam tests use to simulate dependencies

pub mod client;
pub mod dependency;
pub mod result;

use futures_util::future::BoxFuture;

use crate::observability::TraceContext;

pub use client::UpstreamClient;
pub use dependency::{Dependency, DependencyError, PayloadKind};
pub use result::AggregatedResult;

/// Something that can resolve a dependency call to an [`AggregatedResult`].
pub trait Upstream: Send + Sync {
    fn call<'a>(
        &'a self,
        dependency: &'a Dependency,
        trace: &'a TraceContext,
    ) -> BoxFuture<'a, AggregatedResult>;
}
