//! Declared upstream dependencies.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::DependencyConfig;

/// Shape a dependency's JSON payload must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    #[default]
    Any,
    Array,
    Object,
}

impl PayloadKind {
    pub fn matches(&self, payload: &Value) -> bool {
        match self {
            PayloadKind::Any => true,
            PayloadKind::Array => payload.is_array(),
            PayloadKind::Object => payload.is_object(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Any => "any",
            PayloadKind::Array => "array",
            PayloadKind::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("dependency name is empty")]
    EmptyName,

    #[error("dependency {name}: invalid URL {url:?}: {reason}")]
    InvalidUrl { name: String, url: String, reason: String },

    #[error("dependency {name}: unsupported scheme {scheme:?}")]
    UnsupportedScheme { name: String, scheme: String },

    #[error("dependency {0}: timeout must be greater than zero")]
    ZeroTimeout(String),
}

/// One upstream service the gateway fans out to. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    name: String,
    endpoint: Url,
    timeout: Duration,
    expect: PayloadKind,
}

impl Dependency {
    /// `path` is appended to `base_url` as-is (a leading `/` is added if missing).
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        path: &str,
        timeout: Duration,
    ) -> Result<Self, DependencyError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DependencyError::EmptyName);
        }
        if timeout.is_zero() {
            return Err(DependencyError::ZeroTimeout(name));
        }

        let joined = join_path(base_url, path);
        let endpoint = Url::parse(&joined).map_err(|e| DependencyError::InvalidUrl {
            name: name.clone(),
            url: joined.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(DependencyError::UnsupportedScheme {
                name,
                scheme: endpoint.scheme().to_string(),
            });
        }

        Ok(Self {
            name,
            endpoint,
            timeout,
            expect: PayloadKind::Any,
        })
    }

    pub fn expecting(mut self, expect: PayloadKind) -> Self {
        self.expect = expect;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn expect(&self) -> PayloadKind {
        self.expect
    }
}

impl TryFrom<&DependencyConfig> for Dependency {
    type Error = DependencyError;

    fn try_from(config: &DependencyConfig) -> Result<Self, Self::Error> {
        Ok(Dependency::new(
            config.name.clone(),
            &config.base_url,
            &config.path,
            Duration::from_millis(config.timeout_ms),
        )?
        .expecting(config.expect))
    }
}

fn join_path(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();
    if path.is_empty() || path == "/" {
        format!("{}/", base)
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
