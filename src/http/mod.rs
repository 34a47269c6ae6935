//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → middleware/trace_context.rs (TraceContext into extensions)
//!     → [chaos layer on wrapped routes]
//!     → handler → aggregation gateway
//!     → response.rs (aggregate or error to HTTP)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{GatewayServer, ServerError};
