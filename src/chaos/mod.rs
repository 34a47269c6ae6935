//! Fault injection subsystem.
//!
//! # Data Flow
//! ```text
//! Request on a wrapped route:
//!     → layer.rs (FaultInjection service)
//!         → policy.rs decides, drawing from random.rs
//!         → Fail: 500 {"error": ...}, handler never runs
//!         → Proceed(delay): sleep, then run the handler unchanged
//! ```
//!
//! # Design Decisions
//! - One policy per route, immutable after startup
//! - Randomness is injected so tests can force outcomes
//! - Delays are timer-based and only hold up the current request

pub mod layer;
pub mod policy;
pub mod random;

pub use layer::{FaultInjection, FaultInjectionLayer};
pub use policy::{FaultDecision, FaultPolicy, FaultPolicyError};
pub use random::{RandomSource, ThreadRandom};
