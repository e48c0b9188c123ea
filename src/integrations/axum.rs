//! # Axum Integration
//!
//! Router wiring for axum applications: `setup_metrics` installs the metrics
//! middleware and the `/metrics` exposition endpoint, `setup_tracing`
//! installs the server-span middleware. Route templates come from axum's own
//! `MatchedPath` extension, so no extra configuration is needed.
//!
//! Apply `setup_tracing` after `setup_metrics`: layers added later wrap
//! earlier ones, and the trace span must be open while the metrics
//! bookkeeping runs for duration exemplars and log correlation to see it.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus_client::registry::Registry;

use crate::error::MonitorResult;
use crate::metrics::exposition::get_latest_metrics;
use crate::metrics::manager::build_metrics_manager;
use crate::metrics::MetricsConfig;
use crate::middleware::excluded::ExcludedUrls;
use crate::middleware::metrics::MetricsLayer;
use crate::middleware::tracing::TracingLayer;
use crate::trace::TracingConfig;

/// Conventional path of the exposition endpoint.
pub const METRICS_ENDPOINT: &str = "/metrics";

/// Installs request metrics on `router`.
///
/// Builds the instruments in the config's registry, records the application
/// info gauge once, layers the metrics middleware over every route added so
/// far, and (unless disabled) mounts `GET /metrics`. The endpoint is mounted
/// before the layer so scrapes are themselves instrumented.
///
/// Applications that disable the endpoint and expose the registry elsewhere
/// should keep ownership of it and wire the lower-level pieces directly:
/// [`build_metrics_manager`], [`MetricsLayer`] and
/// [`get_latest_metrics`](crate::metrics::get_latest_metrics).
pub fn setup_metrics<S>(router: Router<S>, mut config: MetricsConfig) -> MonitorResult<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let excluded = match &config.exclude_urls_env_key {
        Some(key) => ExcludedUrls::from_env(key)?,
        None => ExcludedUrls::none(),
    };

    let manager = build_metrics_manager(&mut config);
    manager.add_app_info();

    let mut router = router;
    if config.include_metrics_endpoint {
        let registry = Arc::new(config.registry);
        let openmetrics_format = config.openmetrics_format;
        router = router.route(
            METRICS_ENDPOINT,
            get(move || {
                let registry = Arc::clone(&registry);
                async move { render_metrics(&registry, openmetrics_format) }
            }),
        );
    }

    let layer = MetricsLayer::new(
        manager,
        config.include_trace_exemplar,
        config.skip_unmatched_routes,
        excluded,
    );
    Ok(router.layer(layer))
}

/// Installs the tracing middleware on `router`.
pub fn setup_tracing<S>(router: Router<S>, config: TracingConfig) -> MonitorResult<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let layer = TracingLayer::new(config)?;
    Ok(router.layer(layer))
}

fn render_metrics(registry: &Registry, openmetrics_format: bool) -> axum::response::Response {
    match get_latest_metrics(registry, openmetrics_format) {
        Ok(response) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, response.content_type)],
            response.body,
        )
            .into_response(),
        // A scrape with unavailable data must fail loudly, not render empty.
        Err(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response(),
    }
}
