//! # Metrics Container
//!
//! Owns the five request-level instruments for one metric-name prefix and one
//! registry. Every instrument is a label [`Family`], so concurrent updates for
//! different method/path combinations proceed independently and contention is
//! confined to identical label sets inside the metrics client.
//!
//! Construction registers each instrument exactly once into a prefix
//! sub-registry; the container is the unit of creation, so duplicate
//! registration cannot occur for a given prefix+registry pair.

use std::fmt::Write;
use std::sync::atomic::AtomicU64;

use prometheus_client::encoding::{EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::exemplar::HistogramWithExemplars;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Bucket boundaries for the request duration histogram, in seconds.
pub const DEFAULT_DURATION_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Labels for the application-information gauge.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AppInfoLabels {
    /// Name of the instrumented application.
    pub app_name: String,
}

/// Labels for request counters, the duration histogram and the in-progress
/// gauge.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub app_name: String,
    /// HTTP method of the request.
    pub method: String,
    /// Matched route template, not the concrete request path.
    pub path: String,
}

/// Labels for the response counter.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResponseLabels {
    pub app_name: String,
    pub method: String,
    pub path: String,
    /// HTTP status code in string form.
    pub status_code: String,
}

/// Labels for the exception counter.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ExceptionLabels {
    pub app_name: String,
    pub method: String,
    pub path: String,
    /// Short name of the failure class (`"panic"` for caught panics).
    pub exception_type: String,
}

/// Exemplar label set linking a duration observation to the trace it was
/// recorded under. Encoded as `TraceID="<032x trace id>"`, the conventional
/// key emitted alongside histogram bucket samples.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct TraceExemplar {
    pub trace_id: String,
}

impl EncodeLabelSet for TraceExemplar {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        let mut label = encoder.encode_label();
        let mut key = label.encode_label_key()?;
        write!(&mut key, "TraceID")?;
        let mut value = key.encode_label_value()?;
        write!(&mut value, "{}", self.trace_id)?;
        value.finish()
    }
}

type FloatCounter = Counter<f64, AtomicU64>;
type FloatGauge = Gauge<f64, AtomicU64>;
type DurationHistogram = HistogramWithExemplars<TraceExemplar>;
type DurationFamily = Family<RequestLabels, DurationHistogram, fn() -> DurationHistogram>;

fn new_duration_histogram() -> DurationHistogram {
    HistogramWithExemplars::new(DEFAULT_DURATION_BUCKETS.iter().copied())
}

/// The five request-level instruments scoped to one prefix+registry pair.
#[derive(Clone, Debug)]
pub struct MetricsContainer {
    app_info: Family<AppInfoLabels, FloatGauge>,
    requests: Family<RequestLabels, FloatCounter>,
    responses: Family<ResponseLabels, FloatCounter>,
    request_duration: DurationFamily,
    requests_in_progress: Family<RequestLabels, FloatGauge>,
    requests_exceptions: Family<ExceptionLabels, FloatCounter>,
}

impl MetricsContainer {
    /// Creates the instruments and registers them under `prefix` in
    /// `registry`. Emitted metric names are `{prefix}_app_info`,
    /// `{prefix}_requests_total`, `{prefix}_responses_total`,
    /// `{prefix}_request_duration_seconds`, `{prefix}_requests_in_progress`
    /// and `{prefix}_requests_exceptions_total`.
    pub fn new(prefix: &str, registry: &mut Registry) -> Self {
        let registry = registry.sub_registry_with_prefix(prefix);

        let app_info = Family::<AppInfoLabels, FloatGauge>::default();
        registry.register("app_info", "Application information", app_info.clone());

        let requests = Family::<RequestLabels, FloatCounter>::default();
        registry.register(
            "requests",
            "Total count of requests by method and path",
            requests.clone(),
        );

        let responses = Family::<ResponseLabels, FloatCounter>::default();
        registry.register(
            "responses",
            "Total count of responses by method, path and status codes",
            responses.clone(),
        );

        let request_duration = DurationFamily::new_with_constructor(
            new_duration_histogram as fn() -> DurationHistogram,
        );
        registry.register(
            "request_duration_seconds",
            "Histogram of request duration by path, in seconds",
            request_duration.clone(),
        );

        let requests_in_progress = Family::<RequestLabels, FloatGauge>::default();
        registry.register(
            "requests_in_progress",
            "Gauge of requests by method and path currently being processed",
            requests_in_progress.clone(),
        );

        let requests_exceptions = Family::<ExceptionLabels, FloatCounter>::default();
        registry.register(
            "requests_exceptions",
            "Total count of exceptions raised by path and exception type",
            requests_exceptions.clone(),
        );

        Self {
            app_info,
            requests,
            responses,
            request_duration,
            requests_in_progress,
            requests_exceptions,
        }
    }

    pub fn app_info(&self) -> &Family<AppInfoLabels, FloatGauge> {
        &self.app_info
    }

    pub fn requests(&self) -> &Family<RequestLabels, FloatCounter> {
        &self.requests
    }

    pub fn responses(&self) -> &Family<ResponseLabels, FloatCounter> {
        &self.responses
    }

    pub fn request_duration(&self) -> &DurationFamily {
        &self.request_duration
    }

    pub fn requests_in_progress(&self) -> &Family<RequestLabels, FloatGauge> {
        &self.requests_in_progress
    }

    pub fn requests_exceptions(&self) -> &Family<ExceptionLabels, FloatCounter> {
        &self.requests_exceptions
    }
}
