//! Per-route fault policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chaos::random::RandomSource;

/// How often a route fails, and how much latency it adds when it does not.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FaultPolicy {
    /// Probability in `[0, 1]` that a call is rejected.
    pub failure_probability: f64,

    /// Lower bound of the injected delay in milliseconds.
    pub min_latency_ms: u64,

    /// Upper bound (inclusive) of the injected delay in milliseconds.
    pub max_latency_ms: u64,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaultPolicyError {
    #[error("failure_probability {0} is outside [0, 1]")]
    Probability(f64),

    #[error("min_latency_ms {min} exceeds max_latency_ms {max}")]
    LatencyRange { min: u64, max: u64 },
}

/// Outcome of one draw against a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDecision {
    Fail,
    Proceed(Duration),
}

impl FaultPolicy {
    /// Never fails, never delays.
    pub const fn disabled() -> Self {
        Self {
            failure_probability: 0.0,
            min_latency_ms: 0,
            max_latency_ms: 0,
        }
    }

    pub const fn failing(failure_probability: f64) -> Self {
        Self {
            failure_probability,
            min_latency_ms: 0,
            max_latency_ms: 0,
        }
    }

    pub const fn with_latency(self, min_latency_ms: u64, max_latency_ms: u64) -> Self {
        Self {
            min_latency_ms,
            max_latency_ms,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), FaultPolicyError> {
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(FaultPolicyError::Probability(self.failure_probability));
        }
        if self.min_latency_ms > self.max_latency_ms {
            return Err(FaultPolicyError::LatencyRange {
                min: self.min_latency_ms,
                max: self.max_latency_ms,
            });
        }
        Ok(())
    }

    pub fn is_noop(&self) -> bool {
        self.failure_probability <= 0.0 && self.max_latency_ms == 0
    }

    /// Draw the failure check first; the delay is only drawn for calls that
    /// go through.
    pub fn decide(&self, random: &dyn RandomSource) -> FaultDecision {
        if random.unit() < self.failure_probability {
            return FaultDecision::Fail;
        }
        let max = self.max_latency_ms.max(self.min_latency_ms);
        let delay_ms = if max == 0 {
            0
        } else {
            random.latency_ms(self.min_latency_ms, max)
        };
        FaultDecision::Proceed(Duration::from_millis(delay_ms))
    }
}
