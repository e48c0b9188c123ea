//! # Tower Monitor
//!
//! An observability integration toolkit for tower/axum HTTP services. It
//! wires Prometheus-style request metrics and OpenTelemetry distributed
//! tracing into the request pipeline and layers a structured logging
//! configuration on top that can enrich log lines with trace identifiers.
//!
//! ## Key Features
//! - Request metrics middleware: totals, response counts by status, duration
//!   histogram, in-flight gauge and exception counts, labeled by method and
//!   matched route template
//! - Exposition endpoint in classic Prometheus or OpenMetrics text, with
//!   optional multiprocess read-time aggregation
//! - Server-span-per-request tracing with W3C trace-context propagation and
//!   trace-id exemplars on duration observations
//! - JSON structured logging with optional trace/span-id correlation
//!
//! ## Usage Example
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use tower_monitor::integrations::axum::{setup_metrics, setup_tracing};
//! use tower_monitor::metrics::MetricsConfig;
//! use tower_monitor::trace::TracingConfig;
//!
//! # fn main() -> Result<(), tower_monitor::MonitorError> {
//! let app: Router = Router::new().route("/", get(|| async { "hello" }));
//! let app = setup_metrics(app, MetricsConfig::new("my-app").with_prefix("myapp"))?;
//! let app = setup_tracing(app, TracingConfig::new())?;
//! # Ok(())
//! # }
//! ```

/// Error types shared across the crate.
pub mod error;

/// Metrics container, manager, exposition and multiprocess aggregation.
pub mod metrics;

/// Generic tower middleware: request metrics and server-span tracing.
pub mod middleware;

/// Tracing configuration, context plumbing and scoped span helpers.
pub mod trace;

/// Structured logging with optional trace correlation.
pub mod logging;

/// Framework bindings for the generic middleware.
pub mod integrations;

pub use error::{MonitorError, MonitorResult};
pub use logging::{configure_logging, LoggingConfig};
pub use metrics::{build_metrics_manager, MetricsConfig, MetricsManager};
pub use middleware::{MetricsLayer, TracingLayer};
pub use trace::{with_span, with_span_async, TracingConfig};
