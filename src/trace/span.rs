//! Scoped span helpers: run a unit of work with a new span active for its
//! duration, whether the unit is synchronous or suspends cooperatively. The
//! span is parented to whatever context is current at the call site.

use std::borrow::Cow;
use std::future::Future;

use opentelemetry::global;
use opentelemetry::trace::{FutureExt, SpanKind, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};

use super::context::ParentSpanId;

const INSTRUMENTATION_SCOPE: &str = "tower-monitor";

fn span_scope(name: impl Into<Cow<'static, str>>, attributes: Vec<KeyValue>) -> Context {
    let parent = Context::current();
    let tracer = global::tracer(INSTRUMENTATION_SCOPE);
    let builder = tracer
        .span_builder(name)
        .with_kind(SpanKind::Internal)
        .with_attributes(attributes);
    let span = tracer.build_with_context(builder, &parent);

    let parent_span_context = parent.span().span_context().clone();
    let cx = parent.with_span(span);
    if parent_span_context.is_valid() {
        cx.with_value(ParentSpanId(parent_span_context.span_id()))
    } else {
        cx
    }
}

/// Runs `work` with a new span current for its duration.
pub fn with_span<R>(
    name: impl Into<Cow<'static, str>>,
    attributes: Vec<KeyValue>,
    work: impl FnOnce() -> R,
) -> R {
    let cx = span_scope(name, attributes);
    let guard = cx.clone().attach();
    let result = work();
    drop(guard);
    cx.span().end();
    result
}

/// Awaits `work` with a new span current across every poll.
pub async fn with_span_async<F: Future>(
    name: impl Into<Cow<'static, str>>,
    attributes: Vec<KeyValue>,
    work: F,
) -> F::Output {
    let cx = span_scope(name, attributes);
    let result = work.with_context(cx.clone()).await;
    cx.span().end();
    result
}
