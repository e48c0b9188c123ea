//! JSON event formatter for structured log output.
//!
//! Renders one JSON object per event: `timestamp`, `level`, `logger`,
//! `event` (the message), with every event field flattened into the top
//! level. With trace correlation enabled, `trace_id`/`span_id`/
//! `service.name` — and `parent_span_id` when the span has a parent — are
//! injected from the ambient tracing context; when no span is recording the
//! keys are omitted entirely.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::correlation::current_trace_meta;

/// Event formatter producing one JSON object per line.
#[derive(Clone, Debug, Default)]
pub struct JsonEventFormatter {
    include_trace: bool,
    service_name: Option<String>,
}

impl JsonEventFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables trace correlation. `service_name` is emitted as the
    /// `service.name` field on correlated lines; it is captured here because
    /// the tracer provider's resource attributes are not introspectable.
    pub fn with_trace_correlation(service_name: impl Into<String>) -> Self {
        Self {
            include_trace: true,
            service_name: Some(service_name.into()),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonEventFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut fields = Map::new();
        event.record(&mut JsonVisitor(&mut fields));
        let message = match fields.remove("message") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let mut record = Map::new();
        record.insert(
            "timestamp".to_owned(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        record.insert(
            "level".to_owned(),
            Value::String(metadata.level().to_string().to_lowercase()),
        );
        record.insert(
            "logger".to_owned(),
            Value::String(metadata.target().to_owned()),
        );
        record.insert("event".to_owned(), Value::String(message));
        for (key, value) in fields {
            record.insert(key, value);
        }

        if self.include_trace {
            if let Some(meta) = current_trace_meta() {
                record.insert("trace_id".to_owned(), Value::String(meta.trace_id));
                record.insert("span_id".to_owned(), Value::String(meta.span_id));
                if let Some(service_name) = &self.service_name {
                    record.insert(
                        "service.name".to_owned(),
                        Value::String(service_name.clone()),
                    );
                }
                if let Some(parent_span_id) = meta.parent_span_id {
                    record.insert("parent_span_id".to_owned(), Value::String(parent_span_id));
                }
            }
        }

        writeln!(writer, "{}", Value::Object(record))
    }
}

struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl JsonVisitor<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_owned(), value);
    }
}

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}
