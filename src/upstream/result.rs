//! Outcome of one dependency call.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::UpstreamFailure;

/// Payload or failure of one dependency, tagged with its source.
///
/// Holding a `Result` keeps the payload/error pair exclusive: a result
/// always has exactly one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    source: String,
    outcome: Result<Value, UpstreamFailure>,
}

impl AggregatedResult {
    pub fn new(source: impl Into<String>, outcome: Result<Value, UpstreamFailure>) -> Self {
        Self {
            source: source.into(),
            outcome,
        }
    }

    pub fn success(source: impl Into<String>, payload: Value) -> Self {
        Self::new(source, Ok(payload))
    }

    pub fn failure(source: impl Into<String>, failure: UpstreamFailure) -> Self {
        Self::new(source, Err(failure))
    }

    /// Name of the dependency that produced this result.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn payload(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&UpstreamFailure> {
        self.outcome.as_ref().err()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_outcome(self) -> Result<Value, UpstreamFailure> {
        self.outcome
    }
}

/// Serializes as the section value: the raw payload, or the error object.
impl Serialize for AggregatedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.outcome {
            Ok(payload) => payload.serialize(serializer),
            Err(failure) => failure.serialize(serializer),
        }
    }
}
