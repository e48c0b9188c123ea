//! # Request Metrics
//!
//! Prometheus-style request metrics: a container owning the per-prefix
//! instruments, a manager exposing the semantic operations the middleware
//! performs, on-demand exposition in classic or OpenMetrics form, and a
//! read-time multiprocess merge for multi-worker deployments.

pub mod config;
pub mod container;
pub mod exposition;
pub mod manager;
pub mod multiprocess;

pub use config::MetricsConfig;
pub use container::{MetricsContainer, TraceExemplar, DEFAULT_DURATION_BUCKETS};
pub use exposition::{
    get_latest_metrics, MetricsResponse, CONTENT_TYPE_LATEST, OPENMETRICS_CONTENT_TYPE_LATEST,
};
pub use manager::{build_metrics_manager, MetricsManager};
pub use multiprocess::{SnapshotWriter, MULTIPROC_DIR_ENV};
