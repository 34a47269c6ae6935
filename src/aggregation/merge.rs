//! Merged aggregate response.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::upstream::AggregatedResult;

/// Results of one fan-out, in dependency declaration order.
///
/// Serializes as a JSON object keyed by dependency name; keys are written in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    results: Vec<AggregatedResult>,
}

impl Aggregate {
    pub fn new(results: Vec<AggregatedResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[AggregatedResult] {
        &self.results
    }

    pub fn get(&self, source: &str) -> Option<&AggregatedResult> {
        self.results.iter().find(|r| r.source() == source)
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// True when there was at least one dependency and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.failed_count() == self.results.len()
    }

    /// One-line description of the failed sections, e.g.
    /// `categories (Timeout), pricing (UpstreamError)`.
    pub fn failure_summary(&self) -> String {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| format!("{} ({})", r.source(), e.kind())))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Serialize for Aggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.results.len()))?;
        for result in &self.results {
            map.serialize_entry(result.source(), result)?;
        }
        map.end()
    }
}
