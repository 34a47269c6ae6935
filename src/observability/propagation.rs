//! W3C Trace Context propagation.
//!
//! # Responsibilities
//! - Extract trace context from incoming request headers
//! - Start a new trace when the caller sent none
//! - Inject the current hop's identifiers into outbound requests
//!
//! # Design Decisions
//! - `traceparent` only; `tracestate` is not interpreted
//! - traceId and sampled flag cross hops unchanged, spanId is minted per hop
//! - Context is passed explicitly through the call chain, never stored globally

use std::fmt;
use std::str::FromStr;

use axum::http::{HeaderMap, HeaderValue};
use thiserror::Error;

/// Propagation header name.
pub const TRACEPARENT: &str = "traceparent";

const SUPPORTED_VERSION: u8 = 0;
const FLAG_SAMPLED: u8 = 0x01;

/// 128-bit trace identifier, shared by every hop of one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    pub fn random() -> Self {
        loop {
            let id = rand::random::<u128>();
            if id != 0 {
                return Self(id);
            }
        }
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// 64-bit span identifier, unique per hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    pub fn random() -> Self {
        Self(fastrand::u64(1..))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Correlation identifiers of the current hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub sampled: bool,
}

impl TraceContext {
    /// Start a new trace at this hop.
    pub fn new_root(sampled: bool) -> Self {
        Self {
            trace_id: TraceId::random(),
            span_id: SpanId::random(),
            sampled,
        }
    }

    /// Continue a trace received from the previous hop.
    pub fn continue_from(parent: &TraceParent) -> Self {
        Self {
            trace_id: parent.trace_id,
            span_id: SpanId::random(),
            sampled: parent.sampled,
        }
    }

    /// Render this hop as a `traceparent` header value.
    pub fn to_traceparent(&self) -> String {
        let flags = if self.sampled { FLAG_SAMPLED } else { 0 };
        format!(
            "{:02x}-{}-{}-{:02x}",
            SUPPORTED_VERSION, self.trace_id, self.span_id, flags
        )
    }
}

/// Parsed `traceparent` header of the previous hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceParent {
    pub trace_id: TraceId,
    pub parent_id: SpanId,
    pub sampled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceParentError {
    #[error("expected 4 dash-separated fields, got {0}")]
    FieldCount(usize),

    #[error("invalid {field} field {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("version ff is forbidden")]
    ForbiddenVersion,

    #[error("all-zero {0} is invalid")]
    ZeroId(&'static str),
}

impl FromStr for TraceParent {
    type Err = TraceParentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = value.trim().split('-').collect();
        if fields.len() < 4 {
            return Err(TraceParentError::FieldCount(fields.len()));
        }

        let version = parse_hex_field("version", fields[0], 2)? as u8;
        if version == 0xff {
            return Err(TraceParentError::ForbiddenVersion);
        }
        // Later versions may append fields; version 00 may not.
        if version == SUPPORTED_VERSION && fields.len() != 4 {
            return Err(TraceParentError::FieldCount(fields.len()));
        }

        let trace_id = parse_hex_field("trace-id", fields[1], 32)?;
        if trace_id == 0 {
            return Err(TraceParentError::ZeroId("trace-id"));
        }
        let parent_id = parse_hex_field("parent-id", fields[2], 16)? as u64;
        if parent_id == 0 {
            return Err(TraceParentError::ZeroId("parent-id"));
        }
        let flags = parse_hex_field("trace-flags", fields[3], 2)? as u8;

        Ok(Self {
            trace_id: TraceId(trace_id),
            parent_id: SpanId(parent_id),
            sampled: flags & FLAG_SAMPLED == FLAG_SAMPLED,
        })
    }
}

fn parse_hex_field(field: &'static str, value: &str, len: usize) -> Result<u128, TraceParentError> {
    let valid = value.len() == len
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !valid {
        return Err(TraceParentError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    u128::from_str_radix(value, 16).map_err(|_| TraceParentError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Creates or continues trace contexts for inbound requests.
#[derive(Debug, Clone)]
pub struct TracePropagator {
    sample_ratio: f64,
}

impl TracePropagator {
    /// `sample_ratio` is the share of new root traces marked sampled.
    pub fn new(sample_ratio: f64) -> Self {
        Self {
            sample_ratio: sample_ratio.clamp(0.0, 1.0),
        }
    }

    pub fn extract_or_create(&self, headers: &HeaderMap) -> TraceContext {
        let Some(raw) = headers.get(TRACEPARENT) else {
            return TraceContext::new_root(self.should_sample());
        };

        match raw.to_str().map(str::parse::<TraceParent>) {
            Ok(Ok(parent)) => {
                let ctx = TraceContext::continue_from(&parent);
                tracing::trace!(
                    trace_id = %ctx.trace_id,
                    parent_id = %parent.parent_id,
                    span_id = %ctx.span_id,
                    "Continuing inbound trace"
                );
                ctx
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Ignoring malformed traceparent header");
                TraceContext::new_root(self.should_sample())
            }
            Err(_) => {
                tracing::debug!("Ignoring non-ASCII traceparent header");
                TraceContext::new_root(self.should_sample())
            }
        }
    }

    fn should_sample(&self) -> bool {
        self.sample_ratio >= 1.0 || rand::random::<f64>() < self.sample_ratio
    }
}

impl Default for TracePropagator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Write the current hop into outbound headers.
pub fn inject(ctx: &TraceContext, headers: &mut HeaderMap) {
    match HeaderValue::from_str(&ctx.to_traceparent()) {
        Ok(value) => {
            headers.insert(TRACEPARENT, value);
        }
        Err(e) => tracing::debug!(error = %e, "Failed to encode traceparent header"),
    }
}
