//! Configuration for the metrics middleware and exposition endpoint.

use prometheus_client::registry::Registry;

/// Configuration for request metrics.
///
/// The registry defaults to a fresh, isolated one; hand in a shared registry
/// to merge these instruments with metrics the application already exposes.
/// The prefix must be chosen before setup because instruments are created
/// once, at registration time, and are scoped to the prefix+registry pair.
#[derive(Debug)]
pub struct MetricsConfig {
    /// Name of the instrumented application, emitted as the `app_name` label.
    pub app_name: String,

    /// Prefix for every emitted metric name.
    pub metrics_prefix: String,

    /// Registry the instruments are created in.
    pub registry: Registry,

    /// Whether to attach a `TraceID` exemplar to duration observations when a
    /// span is recording.
    pub include_trace_exemplar: bool,

    /// Whether setup should mount a `GET /metrics` endpoint.
    pub include_metrics_endpoint: bool,

    /// Whether the endpoint advertises the OpenMetrics content type instead
    /// of the classic text exposition one.
    pub openmetrics_format: bool,

    /// Whether requests that match no route are left uninstrumented. With
    /// `false`, unmatched requests are recorded under their raw path, which
    /// exposes the label set to unbounded cardinality from probing traffic.
    pub skip_unmatched_routes: bool,

    /// Environment key for an excluded-URL list, checked as
    /// `{KEY}_EXCLUDED_URLS`. `None` disables exclusion for the metrics
    /// middleware.
    pub exclude_urls_env_key: Option<String>,
}

impl MetricsConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            metrics_prefix: "tower".to_owned(),
            registry: Registry::default(),
            include_trace_exemplar: false,
            include_metrics_endpoint: true,
            openmetrics_format: false,
            skip_unmatched_routes: true,
            exclude_urls_env_key: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metrics_prefix = prefix.into();
        self
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_trace_exemplar(mut self, include: bool) -> Self {
        self.include_trace_exemplar = include;
        self
    }

    pub fn with_openmetrics_format(mut self, openmetrics: bool) -> Self {
        self.openmetrics_format = openmetrics;
        self
    }
}
