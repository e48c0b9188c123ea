//! # Metrics Manager
//!
//! A thin facade over [`MetricsContainer`] exposing the semantic operations
//! the request middleware needs, parameterized by method/path/status labels
//! and a fixed application name. All operations are synchronous in-memory
//! atomic updates.

use super::config::MetricsConfig;
use super::container::{
    AppInfoLabels, ExceptionLabels, MetricsContainer, RequestLabels, ResponseLabels, TraceExemplar,
};

/// Builds a manager whose instruments live in the config's registry under the
/// config's prefix. Call once per configuration; the container it creates is
/// the unit of instrument registration.
pub fn build_metrics_manager(config: &mut MetricsConfig) -> MetricsManager {
    let container = MetricsContainer::new(&config.metrics_prefix, &mut config.registry);
    MetricsManager::new(config.app_name.clone(), container)
}

/// Semantic operations over the request-level instruments.
#[derive(Clone, Debug)]
pub struct MetricsManager {
    app_name: String,
    container: MetricsContainer,
}

impl MetricsManager {
    pub fn new(app_name: impl Into<String>, container: MetricsContainer) -> Self {
        Self {
            app_name: app_name.into(),
            container,
        }
    }

    /// Name of the instrumented application, used as the `app_name` label on
    /// every series.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Increments the application-information gauge. Call exactly once at
    /// setup; repeated calls keep adding to the value.
    pub fn add_app_info(&self) {
        self.container
            .app_info()
            .get_or_create(&AppInfoLabels {
                app_name: self.app_name.clone(),
            })
            .inc();
    }

    /// Counts a request at entry, before the handler runs.
    pub fn inc_requests_count(&self, method: &str, path: &str) {
        self.container
            .requests()
            .get_or_create(&self.request_labels(method, path))
            .inc();
    }

    /// Counts a finished response under its status code.
    pub fn inc_responses_count(&self, method: &str, path: &str, status_code: &str) {
        self.container
            .responses()
            .get_or_create(&ResponseLabels {
                app_name: self.app_name.clone(),
                method: method.to_owned(),
                path: path.to_owned(),
                status_code: status_code.to_owned(),
            })
            .inc();
    }

    /// Records a request duration in seconds. When `exemplar` is given it is
    /// attached to whichever histogram bucket the observation falls into;
    /// exemplars are advisory and never affect the recorded value.
    pub fn observe_request_duration(
        &self,
        method: &str,
        path: &str,
        duration: f64,
        exemplar: Option<TraceExemplar>,
    ) {
        self.container
            .request_duration()
            .get_or_create(&self.request_labels(method, path))
            .observe(duration, exemplar);
    }

    /// Marks one more request as currently being processed. Must be paired
    /// with [`MetricsManager::remove_request_in_progress`] on every exit path.
    pub fn add_request_in_progress(&self, method: &str, path: &str) {
        self.container
            .requests_in_progress()
            .get_or_create(&self.request_labels(method, path))
            .inc();
    }

    /// Reverses [`MetricsManager::add_request_in_progress`].
    pub fn remove_request_in_progress(&self, method: &str, path: &str) {
        self.container
            .requests_in_progress()
            .get_or_create(&self.request_labels(method, path))
            .dec();
    }

    /// Counts a failure escaping the handler, keyed by its class name.
    pub fn inc_requests_exceptions_count(&self, method: &str, path: &str, exception_type: &str) {
        self.container
            .requests_exceptions()
            .get_or_create(&ExceptionLabels {
                app_name: self.app_name.clone(),
                method: method.to_owned(),
                path: path.to_owned(),
                exception_type: exception_type.to_owned(),
            })
            .inc();
    }

    fn request_labels(&self, method: &str, path: &str) -> RequestLabels {
        RequestLabels {
            app_name: self.app_name.clone(),
            method: method.to_owned(),
            path: path.to_owned(),
        }
    }
}
