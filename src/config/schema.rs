//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chaos::FaultPolicy;
use crate::upstream::PayloadKind;

/// Root configuration for the aggregation gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dependencies fanned out to by `/aggregate`, in response order.
    pub dependencies: Vec<DependencyConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Fault injection settings.
    pub chaos: ChaosConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            dependencies: vec![
                DependencyConfig::new("categories", "http://localhost:8081", "/categories")
                    .expecting(PayloadKind::Array),
                DependencyConfig::new("pricing", "http://localhost:8082", "/pricing")
                    .expecting(PayloadKind::Array),
            ],
            timeouts: TimeoutConfig::default(),
            chaos: ChaosConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// One upstream dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    /// Unique name; also the key of this dependency's section in responses.
    pub name: String,

    /// Base URL (e.g., "http://localhost:8081").
    pub base_url: String,

    /// Path appended to the base URL.
    #[serde(default = "default_path")]
    pub path: String,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_dependency_timeout_ms")]
    pub timeout_ms: u64,

    /// Expected payload shape.
    #[serde(default)]
    pub expect: PayloadKind,
}

impl DependencyConfig {
    pub fn new(name: &str, base_url: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            path: path.to_string(),
            timeout_ms: default_dependency_timeout_ms(),
            expect: PayloadKind::Any,
        }
    }

    pub fn expecting(mut self, expect: PayloadKind) -> Self {
        self.expect = expect;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Environment variable that overrides `base_url`, e.g. `PRICING_SERVICE_URL`.
    pub fn url_env_var(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}_SERVICE_URL", name)
    }
}

fn default_path() -> String {
    "/".to_string()
}

fn default_dependency_timeout_ms() -> u64 {
    2_000
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall inbound request timeout in milliseconds. Must not be shorter
    /// than any dependency timeout.
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_ms: 10_000 }
    }
}

/// Chaos route name of `/aggregate` and `/home`.
pub const AGGREGATE_ROUTE: &str = "aggregate";
/// Chaos route name of `/might-fail`.
pub const MIGHT_FAIL_ROUTE: &str = "might_fail";

/// Fault injection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Master switch; when off every route behaves as if unwrapped.
    pub enabled: bool,

    /// Policies keyed by route name (`aggregate`, `might_fail`).
    pub routes: BTreeMap<String, FaultPolicy>,
}

impl ChaosConfig {
    /// Policy for `route`; disabled when chaos is off or the route has none.
    pub fn policy_for(&self, route: &str) -> FaultPolicy {
        if !self.enabled {
            return FaultPolicy::disabled();
        }
        self.routes.get(route).copied().unwrap_or_default()
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        let mut routes = BTreeMap::new();
        routes.insert("might_fail".to_string(), FaultPolicy::failing(0.1));
        Self {
            enabled: true,
            routes,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name attached to startup logs.
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Share of new root traces marked sampled, in [0, 1].
    pub sample_ratio: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "home".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
            sample_ratio: 1.0,
        }
    }
}
