//! JSONL layer for structured logging.
//!
//! Every event becomes one JSON object:
//! - timestamp (RFC 3339)
//! - level
//! - service
//! - pid
//! - target (module path)
//! - message
//! - fields (structured key-value pairs, credentials redacted)

use crate::redact::{redact_fields, redact_string};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// A single structured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub service: String,
    pub pid: u32,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
}

/// Visitor that extracts fields from tracing events.
#[derive(Default)]
struct FieldVisitor {
    fields: HashMap<String, Value>,
    message: Option<String>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value_str = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(value_str);
        } else {
            self.insert(field, Value::String(value_str));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }
}

/// Layer that writes redacted JSONL entries to a [`MakeWriter`].
pub struct JsonLayer<W> {
    service_name: String,
    pid: u32,
    make_writer: W,
}

impl<W> JsonLayer<W> {
    pub fn new(service_name: String, make_writer: W) -> Self {
        Self {
            service_name,
            pid: std::process::id(),
            make_writer,
        }
    }

    fn build_entry(&self, level: Level, target: &str, visitor: FieldVisitor, span: Option<String>) -> LogEntry {
        let message = match visitor.message {
            Some(raw) => match redact_string(&raw) {
                Value::String(s) => s,
                other => other.to_string(),
            },
            None => String::new(),
        };

        LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            level: level.as_str().to_string(),
            service: self.service_name.clone(),
            pid: self.pid,
            target: target.to_string(),
            message,
            fields: redact_fields(&visitor.fields),
            span,
        }
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let span = ctx.event_span(event).map(|s| s.name().to_string());
        let metadata = event.metadata();
        let entry = self.build_entry(*metadata.level(), metadata.target(), visitor, span);

        if let Ok(json) = serde_json::to_string(&entry) {
            let mut writer = self.make_writer.make_writer();
            let _ = writeln!(writer, "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::REDACTED;

    #[test]
    fn test_log_entry_serialization_skips_empty_fields() {
        let entry = LogEntry {
            timestamp: "2026-01-15T10:30:00.000000Z".to_string(),
            level: "INFO".to_string(),
            service: "cli".to_string(),
            pid: 12345,
            target: "escrow_auth::session".to_string(),
            message: "Login successful".to_string(),
            fields: HashMap::new(),
            span: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"service\":\"cli\""));
        assert!(json.contains("\"pid\":12345"));
        assert!(!json.contains("\"fields\""));
        assert!(!json.contains("\"span\""));
    }

    #[test]
    fn test_build_entry_redacts_fields_and_message() {
        let layer = JsonLayer::new("cli".to_string(), std::io::sink);
        let mut visitor = FieldVisitor::default();
        visitor
            .fields
            .insert("refresh_token".to_string(), Value::String("r1".to_string()));
        visitor.message = Some("Bearer t1".to_string());

        let entry = layer.build_entry(Level::WARN, "escrow_auth", visitor, None);
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.message, REDACTED);
        assert_eq!(
            entry.fields["refresh_token"],
            Value::String(REDACTED.to_string())
        );
    }
}
