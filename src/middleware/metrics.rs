//! # Request Metrics Middleware
//!
//! The per-request instrumentation core: a tower layer that counts requests,
//! tracks the in-flight gauge, times the downstream handler and records the
//! response outcome. Finalization is owned by a guard whose `Drop` runs the
//! bookkeeping with a 500-class sentinel, so the in-progress gauge cannot
//! leak — not on handler panics, not on inner-service errors, and not when
//! the host framework drops the request future mid-flight.
//!
//! Requests are labeled by method and matched route template. Upgrade
//! handshakes, excluded paths and (by default) route misses pass through
//! untouched.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use http::{Request, Response, StatusCode};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use tower::{Layer, Service};

use crate::metrics::container::TraceExemplar;
use crate::metrics::manager::MetricsManager;
use crate::middleware::excluded::ExcludedUrls;
use crate::middleware::route::route_template;
use crate::trace::context::format_trace_id;

/// Tower layer applying [`MetricsService`] to an inner service.
#[derive(Clone, Debug)]
pub struct MetricsLayer {
    state: Arc<MetricsState>,
}

#[derive(Debug)]
struct MetricsState {
    manager: MetricsManager,
    include_trace_exemplar: bool,
    skip_unmatched_routes: bool,
    excluded: ExcludedUrls,
}

impl MetricsLayer {
    pub fn new(
        manager: MetricsManager,
        include_trace_exemplar: bool,
        skip_unmatched_routes: bool,
        excluded: ExcludedUrls,
    ) -> Self {
        Self {
            state: Arc::new(MetricsState {
                manager,
                include_trace_exemplar,
                skip_unmatched_routes,
                excluded,
            }),
        }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

/// Service wrapper recording request metrics around the inner service.
#[derive(Clone, Debug)]
pub struct MetricsService<S> {
    inner: S,
    state: Arc<MetricsState>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
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
        // The inner service was readied by `poll_ready`; swap it out so the
        // readied instance is the one driven inside the future.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = Arc::clone(&self.state);

        let path = request.uri().path();
        if request.headers().contains_key(http::header::UPGRADE)
            || state.excluded.is_excluded(path)
        {
            return Box::pin(async move { inner.call(request).await });
        }

        let path_label = match route_template(&request) {
            Some(template) => template,
            None if state.skip_unmatched_routes => {
                return Box::pin(async move { inner.call(request).await });
            }
            None => path.to_owned(),
        };
        let method = request.method().as_str().to_owned();

        Box::pin(async move {
            state.manager.inc_requests_count(&method, &path_label);
            state.manager.add_request_in_progress(&method, &path_label);
            let mut guard = FinalizeGuard::new(state, method, path_label);

            match AssertUnwindSafe(inner.call(request)).catch_unwind().await {
                Ok(Ok(response)) => {
                    guard.finalize(response.status());
                    Ok(response)
                }
                Ok(Err(error)) => {
                    guard.record_exception(short_type_name::<S::Error>());
                    guard.finalize(StatusCode::INTERNAL_SERVER_ERROR);
                    Err(error)
                }
                Err(panic) => {
                    guard.record_exception("panic");
                    guard.finalize(StatusCode::INTERNAL_SERVER_ERROR);
                    std::panic::resume_unwind(panic)
                }
            }
        })
    }
}

/// Guaranteed-release finalization for one request. `Drop` finalizes with the
/// 500-class sentinel when no outcome was observed, which covers cancelled
/// request futures.
struct FinalizeGuard {
    state: Arc<MetricsState>,
    method: String,
    path: String,
    start: Instant,
    finalized: bool,
}

impl FinalizeGuard {
    fn new(state: Arc<MetricsState>, method: String, path: String) -> Self {
        Self {
            state,
            method,
            path,
            start: Instant::now(),
            finalized: false,
        }
    }

    fn record_exception(&self, exception_type: &str) {
        self.state
            .manager
            .inc_requests_exceptions_count(&self.method, &self.path, exception_type);
    }

    fn finalize(&mut self, status: StatusCode) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let duration = self.start.elapsed().as_secs_f64();
        let exemplar = if self.state.include_trace_exemplar {
            current_trace_exemplar()
        } else {
            None
        };
        self.state
            .manager
            .observe_request_duration(&self.method, &self.path, duration, exemplar);
        self.state
            .manager
            .inc_responses_count(&self.method, &self.path, status.as_str());
        self.state
            .manager
            .remove_request_in_progress(&self.method, &self.path);
    }
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        self.finalize(StatusCode::INTERNAL_SERVER_ERROR);
    }
}

/// Exemplar for the currently recording span, if any.
fn current_trace_exemplar() -> Option<TraceExemplar> {
    let cx = Context::current();
    let span = cx.span();
    if !span.is_recording() {
        return None;
    }
    let span_context = span.span_context();
    if !span_context.is_valid() {
        return None;
    }
    Some(TraceExemplar {
        trace_id: format_trace_id(span_context.trace_id()),
    })
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
