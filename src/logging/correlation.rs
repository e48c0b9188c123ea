//! Trace correlation for log records. Reads the ambient OpenTelemetry
//! context at emission time; when no span is active or the active span is
//! not recording, nothing is injected. Extraction is best-effort by
//! construction — every failure path degrades to "no trace fields".

use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;

use crate::trace::context::{format_span_id, format_trace_id, ParentSpanId};

/// Identifiers of the currently active span, hex-encoded for log output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceMeta {
    pub trace_id: String,
    pub span_id: String,
    /// Present only when the active span has a parent; a root span's log
    /// lines deliberately carry no placeholder.
    pub parent_span_id: Option<String>,
}

/// Reads the active span from the ambient tracing context.
pub fn current_trace_meta() -> Option<TraceMeta> {
    let cx = Context::current();
    let span = cx.span();
    if !span.is_recording() {
        return None;
    }
    let span_context = span.span_context();
    if !span_context.is_valid() {
        return None;
    }
    Some(TraceMeta {
        trace_id: format_trace_id(span_context.trace_id()),
        span_id: format_span_id(span_context.span_id()),
        parent_span_id: cx.get::<ParentSpanId>().map(|parent| format_span_id(parent.0)),
    })
}
