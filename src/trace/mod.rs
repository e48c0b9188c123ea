//! # Distributed Tracing
//!
//! OpenTelemetry integration: configuration for the server-span middleware,
//! W3C trace-context extraction, and scoped span helpers for instrumenting
//! units of work inside handlers.

pub mod config;
pub mod context;
pub mod span;

pub use config::{
    default_span_details, detailed_span_details, RequestDetails, RequestHook, RequestMeta,
    ResponseHook, ResponseMeta, SpanDetails, SpanDetailsExtractor, TracingConfig,
};
pub use context::{extract_remote_context, format_span_id, format_trace_id, ParentSpanId};
pub use span::{with_span, with_span_async};
