//! Configuration for the tracing middleware.

use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode, Uri};
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;

const INSTRUMENTATION_SCOPE: &str = "tower-monitor";

/// Borrowed view of an inbound request handed to the span-details extractor
/// and the server-request hook.
#[derive(Debug)]
pub struct RequestDetails<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    /// Matched route template when the host framework resolved one.
    pub route: Option<&'a str>,
}

/// Span name and attributes chosen for one request.
#[derive(Debug, Clone)]
pub struct SpanDetails {
    pub name: String,
    pub attributes: Vec<KeyValue>,
}

/// Maps an inbound request to its span name and attributes. Swappable per
/// application; span-name cardinality is an application-level tradeoff.
pub type SpanDetailsExtractor =
    Arc<dyn for<'a> Fn(&RequestDetails<'a>) -> SpanDetails + Send + Sync>;

/// Owned request snapshot passed to the server-request hook.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
}

/// Owned response snapshot passed to the server-response hook.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
}

/// Callback invoked with the span context right after the server span opens.
pub type RequestHook = Arc<dyn Fn(&Context, &RequestMeta) + Send + Sync>;

/// Callback invoked with the span context once a response is produced.
pub type ResponseHook = Arc<dyn Fn(&Context, &ResponseMeta) + Send + Sync>;

/// Default span details: `"{METHOD} {route}"` with an `http.route` attribute
/// when a route template resolved, the bare method otherwise (no route
/// attribute — an unresolved route must not leak raw paths into span names).
pub fn default_span_details(details: &RequestDetails<'_>) -> SpanDetails {
    match details.route {
        Some(route) => SpanDetails {
            name: format!("{} {}", details.method, route),
            attributes: vec![KeyValue::new("http.route", route.to_owned())],
        },
        None => SpanDetails {
            name: details.method.to_string(),
            attributes: Vec::new(),
        },
    }
}

/// Span details enriched with target/scheme/user-agent attributes, for
/// applications that want fuller server spans.
pub fn detailed_span_details(details: &RequestDetails<'_>) -> SpanDetails {
    let mut span_details = default_span_details(details);
    span_details.attributes.push(KeyValue::new(
        "http.method",
        details.method.as_str().to_owned(),
    ));
    span_details.attributes.push(KeyValue::new(
        "http.target",
        details
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| details.uri.path().to_owned()),
    ));
    if let Some(scheme) = details.uri.scheme_str() {
        span_details
            .attributes
            .push(KeyValue::new("http.scheme", scheme.to_owned()));
    }
    if let Some(host) = details.headers.get(http::header::HOST) {
        if let Ok(host) = host.to_str() {
            span_details
                .attributes
                .push(KeyValue::new("http.host", host.to_owned()));
        }
    }
    if let Some(agent) = details.headers.get(http::header::USER_AGENT) {
        if let Ok(agent) = agent.to_str() {
            span_details
                .attributes
                .push(KeyValue::new("http.user_agent", agent.to_owned()));
        }
    }
    span_details
}

/// Configuration for the OpenTelemetry tracing middleware.
#[derive(Clone)]
pub struct TracingConfig {
    /// Key for the excluded-URL environment lookup, checked as
    /// `{KEY}_EXCLUDED_URLS`.
    pub exclude_urls_env_key: String,

    /// Extractor mapping a request to its span name and attributes.
    pub span_details: SpanDetailsExtractor,

    /// Optional callback invoked when the server span opens.
    pub server_request_hook: Option<RequestHook>,

    /// Optional callback invoked when a response is produced.
    pub server_response_hook: Option<ResponseHook>,

    /// Tracer provider to create spans from. `None` uses the process-global
    /// provider.
    pub tracer_provider: Option<TracerProvider>,

    /// Propagator for inbound trace-context headers. `None` uses W3C
    /// trace-context.
    pub propagator: Option<Arc<dyn TextMapPropagator + Send + Sync>>,
}

impl TracingConfig {
    pub fn new() -> Self {
        Self {
            exclude_urls_env_key: "TOWER".to_owned(),
            span_details: Arc::new(default_span_details),
            server_request_hook: None,
            server_response_hook: None,
            tracer_provider: None,
            propagator: None,
        }
    }

    pub fn with_tracer_provider(mut self, provider: TracerProvider) -> Self {
        self.tracer_provider = Some(provider);
        self
    }

    pub fn with_span_details(mut self, extractor: SpanDetailsExtractor) -> Self {
        self.span_details = extractor;
        self
    }

    pub(crate) fn tracer(&self) -> BoxedTracer {
        match &self.tracer_provider {
            Some(provider) => BoxedTracer::new(Box::new(provider.tracer(INSTRUMENTATION_SCOPE))),
            None => global::tracer(INSTRUMENTATION_SCOPE),
        }
    }

    pub(crate) fn propagator(&self) -> Arc<dyn TextMapPropagator + Send + Sync> {
        self.propagator
            .clone()
            .unwrap_or_else(|| Arc::new(TraceContextPropagator::new()))
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TracingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingConfig")
            .field("exclude_urls_env_key", &self.exclude_urls_env_key)
            .field("server_request_hook", &self.server_request_hook.is_some())
            .field("server_response_hook", &self.server_response_hook.is_some())
            .field("tracer_provider", &self.tracer_provider.is_some())
            .finish()
    }
}
