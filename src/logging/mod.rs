//! # Structured Logging
//!
//! Logging configuration on top of `tracing-subscriber`: JSON or
//! human-readable console output with env-filter level control, and optional
//! enrichment of every log line with the identifiers of the currently active
//! trace span.

pub mod correlation;
pub mod formatter;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::{MonitorError, MonitorResult};

pub use correlation::{current_trace_meta, TraceMeta};
pub use formatter::JsonEventFormatter;

/// Configuration for log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level directive when `RUST_LOG` is not set.
    pub level: String,

    /// JSON output when true, human-readable console output otherwise.
    pub json_format: bool,

    /// Whether JSON lines are enriched with trace/span identifiers.
    pub include_trace: bool,

    /// Value of the `service.name` field on trace-correlated lines.
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json_format: true,
            include_trace: false,
            service_name: "unknown_service".to_owned(),
        }
    }
}

/// Installs the global tracing subscriber according to `config`.
///
/// Respects `RUST_LOG` when present. Fails if a global subscriber is already
/// installed.
pub fn configure_logging(config: &LoggingConfig) -> MonitorResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = if config.json_format {
        let format = if config.include_trace {
            JsonEventFormatter::with_trace_correlation(config.service_name.clone())
        } else {
            JsonEventFormatter::new()
        };
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().event_format(format))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    result.map_err(|error| MonitorError::LoggingInit {
        message: error.to_string(),
    })
}
