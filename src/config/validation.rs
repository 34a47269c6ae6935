//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, probabilities in [0, 1])
//! - Check the gateway timeout outlasts every dependency timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::chaos::FaultPolicyError;
use crate::config::schema::{GatewayConfig, AGGREGATE_ROUTE};
use crate::upstream::{Dependency, DependencyError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("at least one dependency must be configured")]
    NoDependencies,

    #[error("duplicate dependency name {0:?}")]
    DuplicateDependency(String),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("timeouts.request_ms ({request_ms}) must be at least {required_ms}: longest dependency timeout plus aggregate latency plus {headroom_ms}ms headroom")]
    RequestTimeoutTooShort {
        request_ms: u64,
        required_ms: u64,
        headroom_ms: u64,
    },

    #[error("chaos route {route}: {source}")]
    FaultPolicy {
        route: String,
        #[source]
        source: FaultPolicyError,
    },

    #[error("observability.sample_ratio {0} is outside [0, 1]")]
    SampleRatio(f64),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.dependencies.is_empty() {
        errors.push(ValidationError::NoDependencies);
    }

    let mut names = HashSet::new();
    for dependency in &config.dependencies {
        if !names.insert(dependency.name.as_str()) {
            errors.push(ValidationError::DuplicateDependency(dependency.name.clone()));
        }
        if let Err(e) = Dependency::try_from(dependency) {
            errors.push(e.into());
        }
    }

    let required = min_request_timeout(config);
    if Duration::from_millis(config.timeouts.request_ms) < required {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_ms: config.timeouts.request_ms,
            required_ms: required.as_millis() as u64,
            headroom_ms: REQUEST_TIMEOUT_HEADROOM.as_millis() as u64,
        });
    }

    for (route, policy) in &config.chaos.routes {
        if let Err(source) = policy.validate() {
            errors.push(ValidationError::FaultPolicy {
                route: route.clone(),
                source,
            });
        }
    }

    let ratio = config.observability.sample_ratio;
    if !(0.0..=1.0).contains(&ratio) {
        errors.push(ValidationError::SampleRatio(ratio));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Time left after the slowest dependency gives up, to merge and respond.
pub const REQUEST_TIMEOUT_HEADROOM: Duration = Duration::from_millis(250);

/// Shortest overall request timeout that never cuts a dependency call short.
///
/// The overall deadline starts before the `aggregate` route's injected
/// latency and before the fan-out, so both are added to the longest
/// dependency timeout.
pub fn min_request_timeout(config: &GatewayConfig) -> Duration {
    let policy = config.chaos.policy_for(AGGREGATE_ROUTE);
    let injected = Duration::from_millis(policy.max_latency_ms.max(policy.min_latency_ms));
    max_dependency_timeout(config) + injected + REQUEST_TIMEOUT_HEADROOM
}

/// Longest per-dependency timeout.
pub fn max_dependency_timeout(config: &GatewayConfig) -> Duration {
    config
        .dependencies
        .iter()
        .map(|d| Duration::from_millis(d.timeout_ms))
        .max()
        .unwrap_or_default()
}
