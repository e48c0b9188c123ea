//! # Error Handling
//!
//! Error types for the monitoring toolkit, built on `thiserror`. Setup-time
//! problems (bad exclusion patterns, logging double-initialization) are
//! surfaced here so they fail at startup rather than on the request hot path;
//! scrape-time problems (a misconfigured multiprocess directory) propagate to
//! the caller instead of silently rendering an empty body.

use thiserror::Error;

/// Result type used throughout the crate.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors raised by the monitoring toolkit.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Invalid configuration supplied at setup time (e.g. a malformed
    /// excluded-URL pattern).
    #[error("invalid monitoring configuration: {message}")]
    Configuration { message: String },

    /// Encoding the registry into exposition text failed.
    #[error("failed to encode metrics: {0}")]
    Exposition(#[from] std::fmt::Error),

    /// The multiprocess coordination directory could not be read or written.
    #[error("multiprocess metrics directory {path:?}: {source}")]
    Multiprocess {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file did not parse as exposition text.
    #[error("malformed metrics snapshot {path:?}: {message}")]
    MalformedSnapshot {
        path: std::path::PathBuf,
        message: String,
    },

    /// The global logging subscriber could not be installed.
    #[error("failed to initialize logging: {message}")]
    LoggingInit { message: String },
}

impl MonitorError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
