//! Aggregation gateway library.
//!
//! One inbound request fans out to every configured dependency, the answers
//! are merged in declaration order, and a W3C trace context follows every
//! hop. Routes can be wrapped in fault injection to exercise failure paths.

pub mod aggregation;
pub mod backends;
pub mod chaos;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod upstream;

pub use aggregation::{Aggregate, AggregationGateway};
pub use config::schema::GatewayConfig;
pub use error::{ErrorKind, GatewayError, UpstreamFailure};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
