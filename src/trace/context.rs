//! Trace-context plumbing: header carrier for W3C propagation, hex encoding
//! of trace/span identifiers, and the typed context value that carries the
//! parent span id to the logging processor.

use http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::{SpanId, TraceId};
use opentelemetry::Context;

/// Read-only carrier over HTTP headers for trace-context extraction.
pub(crate) struct HeaderCarrier<'a>(pub &'a HeaderMap);

impl Extractor for HeaderCarrier<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|key| key.as_str()).collect()
    }
}

/// Extracts the remote parent context from inbound request headers.
pub fn extract_remote_context(
    headers: &HeaderMap,
    propagator: &(dyn TextMapPropagator + Send + Sync),
) -> Context {
    propagator.extract(&HeaderCarrier(headers))
}

/// Fixed-width lowercase hex encoding of a trace id.
pub fn format_trace_id(trace_id: TraceId) -> String {
    format!("{:032x}", u128::from_be_bytes(trace_id.to_bytes()))
}

/// Fixed-width lowercase hex encoding of a span id.
pub fn format_span_id(span_id: SpanId) -> String {
    format!("{:016x}", u64::from_be_bytes(span_id.to_bytes()))
}

/// Parent span id of the currently active span, carried as a typed context
/// value. The OpenTelemetry context only exposes the active span's own
/// identifiers, so span-creation sites stash the parent here for the logging
/// processor; its absence means the active span is a trace root.
#[derive(Clone, Copy, Debug)]
pub struct ParentSpanId(pub SpanId);
