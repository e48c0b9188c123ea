//! # Metrics Exposition
//!
//! Renders a registry's current state on demand, in classic Prometheus text
//! or OpenMetrics form. When the `PROMETHEUS_MULTIPROC_DIR` environment
//! variable names a coordination directory, rendering switches to a read-time
//! merge of the per-worker snapshot files found there instead of the
//! in-process registry. A misconfigured directory fails the scrape loudly; a
//! caller scraping metrics needs to know the data is unavailable, not
//! silently receive zero series.

use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;

use crate::error::MonitorResult;
use crate::metrics::multiprocess;

/// Content type of the classic text exposition format.
pub const CONTENT_TYPE_LATEST: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Content type of the OpenMetrics exposition format.
pub const OPENMETRICS_CONTENT_TYPE_LATEST: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

const EOF_TRAILER: &str = "# EOF\n";

/// A rendered metrics payload ready to be served.
#[derive(Debug, Clone)]
pub struct MetricsResponse {
    pub status_code: u16,
    pub content_type: &'static str,
    pub body: String,
}

/// Renders the latest metrics for `registry`.
///
/// `openmetrics_format` selects the advertised content type and whether the
/// body carries the OpenMetrics `# EOF` trailer. The encoder emits
/// OpenMetrics-flavored text either way; exemplar rendering under the classic
/// content type is an exporter detail, not a contract.
pub fn get_latest_metrics(
    registry: &Registry,
    openmetrics_format: bool,
) -> MonitorResult<MetricsResponse> {
    let mut body = match multiprocess::coordination_dir() {
        Some(dir) => multiprocess::gather(&dir)?,
        None => {
            let mut buffer = String::new();
            encode(&mut buffer, registry)?;
            if let Some(stripped) = buffer.strip_suffix(EOF_TRAILER) {
                buffer.truncate(stripped.len());
            }
            buffer
        }
    };

    let content_type = if openmetrics_format {
        body.push_str(EOF_TRAILER);
        OPENMETRICS_CONTENT_TYPE_LATEST
    } else {
        CONTENT_TYPE_LATEST
    };

    Ok(MetricsResponse {
        status_code: 200,
        content_type,
        body,
    })
}
