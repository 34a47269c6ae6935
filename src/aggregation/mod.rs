//! Request aggregation.
//!
//! # Data Flow
//! ```text
//! GET /aggregate (trace context in hand)
//!     → gateway.rs (one upstream call per dependency, all concurrent)
//!     → merge.rs (results in declaration order)
//!     → 200 with mixed sections, or 502 when every dependency failed
//! ```
//!
//! # Design Decisions
//! - Fan-out never short-circuits; slow or failing dependencies only cost
//!   their own section
//! - Output order is declaration order, not completion order

pub mod gateway;
pub mod merge;

pub use gateway::AggregationGateway;
pub use merge::Aggregate;
