//! # Request Tracing Middleware
//!
//! Opens a server-kind span around every instrumented request. Inbound W3C
//! trace-context headers are extracted and used as the span's parent, the
//! span is named through the configurable span-details extractor, and the
//! span's context is made current for the downstream future so handlers,
//! duration exemplars and log correlation all observe the same active span.
//!
//! The middleware only observes: HTTP error responses and panics are
//! recorded on the span and then propagate unchanged.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::future::BoxFuture;
use futures::FutureExt as _;
use http::{Request, Response, StatusCode};
use opentelemetry::global::BoxedTracer;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{
    FutureExt as OtelFutureExt, SpanKind, Status, TraceContextExt, Tracer,
};
use opentelemetry::{Context, KeyValue};
use tower::{Layer, Service};

use crate::error::MonitorResult;
use crate::middleware::excluded::ExcludedUrls;
use crate::middleware::route::route_template;
use crate::trace::config::{RequestDetails, RequestMeta, ResponseMeta, TracingConfig};
use crate::trace::context::{HeaderCarrier, ParentSpanId};

/// Tower layer applying [`TracingService`] to an inner service.
#[derive(Clone)]
pub struct TracingLayer {
    state: Arc<TracingState>,
}

struct TracingState {
    tracer: BoxedTracer,
    config: TracingConfig,
    propagator: Arc<dyn TextMapPropagator + Send + Sync>,
    excluded: ExcludedUrls,
}

impl TracingLayer {
    /// Builds the layer, compiling the excluded-URL list for the config's
    /// environment key. Fails on malformed exclusion patterns.
    pub fn new(config: TracingConfig) -> MonitorResult<Self> {
        let excluded = ExcludedUrls::from_env(&config.exclude_urls_env_key)?;
        let tracer = config.tracer();
        let propagator = config.propagator();
        Ok(Self {
            state: Arc::new(TracingState {
                tracer,
                config,
                propagator,
                excluded,
            }),
        })
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

/// Service wrapper running the inner service inside a server span.
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
    state: Arc<TracingState>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TracingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = Arc::clone(&self.state);

        if state.excluded.is_excluded(request.uri().path()) {
            return Box::pin(async move { inner.call(request).await });
        }

        let route = route_template(&request);
        let details = (state.config.span_details)(&RequestDetails {
            method: request.method(),
            uri: request.uri(),
            headers: request.headers(),
            route: route.as_deref(),
        });

        let parent_cx = state.propagator.extract(&HeaderCarrier(request.headers()));
        let parent_span_context = parent_cx.span().span_context().clone();

        let builder = state
            .tracer
            .span_builder(details.name)
            .with_kind(SpanKind::Server)
            .with_attributes(details.attributes);
        let span = state.tracer.build_with_context(builder, &parent_cx);

        let mut cx = parent_cx.with_span(span);
        if parent_span_context.is_valid() {
            cx = cx.with_value(ParentSpanId(parent_span_context.span_id()));
        }

        if let Some(hook) = &state.config.server_request_hook {
            let meta = RequestMeta {
                method: request.method().as_str().to_owned(),
                path: route.unwrap_or_else(|| request.uri().path().to_owned()),
            };
            hook(&cx, &meta);
        }

        let span_cx = cx.clone();
        let instrumented = async move {
            match AssertUnwindSafe(inner.call(request)).catch_unwind().await {
                Ok(Ok(response)) => {
                    set_status_code(&span_cx, response.status());
                    if let Some(hook) = &state.config.server_response_hook {
                        hook(
                            &span_cx,
                            &ResponseMeta {
                                status: response.status(),
                            },
                        );
                    }
                    span_cx.span().end();
                    Ok(response)
                }
                Ok(Err(error)) => {
                    set_status_code(&span_cx, StatusCode::INTERNAL_SERVER_ERROR);
                    span_cx.span().end();
                    Err(error)
                }
                Err(panic) => {
                    let span = span_cx.span();
                    span.set_attribute(KeyValue::new(
                        "http.status_code",
                        i64::from(StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
                    ));
                    span.set_status(Status::error("request handler panicked"));
                    span.end();
                    std::panic::resume_unwind(panic)
                }
            }
        };

        Box::pin(instrumented.with_context(cx))
    }
}

/// Records the response status on the span: `http.status_code` always, span
/// status Ok below 400 and Error at 400 and above.
fn set_status_code(cx: &Context, status: StatusCode) {
    let span = cx.span();
    span.set_attribute(KeyValue::new(
        "http.status_code",
        i64::from(status.as_u16()),
    ));
    if status.is_client_error() || status.is_server_error() {
        span.set_status(Status::error(format!("HTTP {}", status.as_u16())));
    } else {
        span.set_status(Status::Ok);
    }
}
