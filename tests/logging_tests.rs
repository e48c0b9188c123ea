//! Tests for the JSON log formatter and trace correlation: field layout,
//! key absence without an active span, and identifier injection with one.

use std::io;
use std::sync::{Arc, Mutex};

use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
use opentelemetry_sdk::trace::TracerProvider;
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use tower_monitor::logging::{configure_logging, JsonEventFormatter, LoggingConfig};
use tower_monitor::trace::with_span;

#[derive(Clone, Default)]
struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureWriter {
    fn contents(&self) -> String {
        String::from_utf8(self.buffer.lock().expect("buffer lock").clone())
            .expect("utf-8 log output")
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("buffer lock")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `work` under a subscriber using `format` and parses the first
/// emitted line as JSON.
fn capture_with(format: JsonEventFormatter, work: impl FnOnce()) -> Value {
    let writer = CaptureWriter::default();
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .event_format(format)
            .with_writer(writer.clone()),
    );
    tracing::subscriber::with_default(subscriber, work);

    let contents = writer.contents();
    let line = contents.lines().next().expect("one log line");
    serde_json::from_str(line).expect("valid json log line")
}

fn is_lower_hex(value: &str, len: usize) -> bool {
    value.len() == len
        && value
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

#[test]
fn json_line_has_standard_fields() {
    let record = capture_with(JsonEventFormatter::new(), || {
        tracing::info!(user_id = 7, "hello world");
    });

    assert_eq!(record["event"], "hello world");
    assert_eq!(record["level"], "info");
    assert_eq!(record["user_id"], 7);
    assert!(record["logger"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(record["timestamp"].as_str().is_some_and(|s| !s.is_empty()));
}

#[test]
fn event_fields_are_flattened_at_top_level() {
    let record = capture_with(JsonEventFormatter::new(), || {
        tracing::warn!(attempts = 3_u64, retriable = false, job = "sync", "giving up");
    });

    assert_eq!(record["attempts"], 3);
    assert_eq!(record["retriable"], false);
    assert_eq!(record["job"], "sync");
    assert_eq!(record["level"], "warn");
}

#[test]
fn trace_keys_are_absent_without_an_active_span() {
    let record = capture_with(
        JsonEventFormatter::with_trace_correlation("test-service"),
        || {
            tracing::info!("not traced");
        },
    );

    assert!(record.get("trace_id").is_none());
    assert!(record.get("span_id").is_none());
    assert!(record.get("parent_span_id").is_none());
    assert!(record.get("service.name").is_none());
}

#[test]
fn trace_correlation_injects_identifiers() {
    let exporter = InMemorySpanExporter::default();
    let provider = TracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    opentelemetry::global::set_tracer_provider(provider);

    // Root span: identifiers present, parent deliberately absent.
    let root = capture_with(
        JsonEventFormatter::with_trace_correlation("test-service"),
        || {
            with_span("root-work", Vec::new(), || {
                tracing::info!("inside root span");
            });
        },
    );
    let trace_id = root["trace_id"].as_str().expect("trace_id present");
    let span_id = root["span_id"].as_str().expect("span_id present");
    assert!(is_lower_hex(trace_id, 32));
    assert!(is_lower_hex(span_id, 16));
    assert_eq!(root["service.name"], "test-service");
    assert!(root.get("parent_span_id").is_none());

    // Nested span: parent id appears.
    let nested = capture_with(
        JsonEventFormatter::with_trace_correlation("test-service"),
        || {
            with_span("outer-work", Vec::new(), || {
                with_span("inner-work", Vec::new(), || {
                    tracing::info!("inside nested span");
                });
            });
        },
    );
    let parent_span_id = nested["parent_span_id"]
        .as_str()
        .expect("parent_span_id present");
    assert!(is_lower_hex(parent_span_id, 16));
    assert_ne!(nested["span_id"], nested["parent_span_id"]);
}

#[test]
fn configure_logging_fails_on_second_install() {
    let config = LoggingConfig::default();
    let first = configure_logging(&config);
    let second = configure_logging(&config);

    assert!(first.is_ok());
    assert!(second.is_err());
}
