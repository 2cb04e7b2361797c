//! Structured log records and their wire shape.
//!
//! A [`LogRecord`] is what call sites hand to the logging channel. The
//! collector decides how to put it on the wire; [`WireRecord`] is the
//! JSON shape the Cloud Logging agent parses from a container's stdout.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::observability::trace_context::TraceContext;

pub const KEY_SEVERITY: &str = "severity";
pub const KEY_MESSAGE: &str = "message";
pub const KEY_TRACE: &str = "logging.googleapis.com/trace";
pub const KEY_SPAN_ID: &str = "logging.googleapis.com/spanId";
pub const KEY_TRACE_SAMPLED: &str = "logging.googleapis.com/trace_sampled";

/// Prefix of keys the log agent interprets itself.
const RESERVED_PREFIX: &str = "logging.googleapis.com/";

/// Severity of a record, named the way the collector expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&tracing::Level> for Severity {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warning,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Value of a metadata field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Unsigned(n) => write!(f, "{}", n),
            FieldValue::Float(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Unsigned(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Metadata attached to a record, ordered by key.
pub type Fields = BTreeMap<String, FieldValue>;

/// One structured log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
    pub fields: Fields,
    /// Request trace this record belongs to, if any.
    pub trace: Option<TraceContext>,
}

impl LogRecord {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            fields: Fields::new(),
            trace: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_trace(mut self, trace: Option<TraceContext>) -> Self {
        self.trace = trace;
        self
    }

    /// Borrow this record in its wire shape.
    ///
    /// `project_id` qualifies the trace id as a Cloud Trace resource name.
    pub fn to_wire<'a>(&'a self, project_id: Option<&'a str>) -> WireRecord<'a> {
        WireRecord {
            record: self,
            project_id,
        }
    }
}

/// Returns true if `key` would collide with a key the wire shape owns.
pub fn is_reserved_key(key: &str) -> bool {
    key == KEY_SEVERITY || key == KEY_MESSAGE || key.starts_with(RESERVED_PREFIX)
}

/// Borrowed JSON view of a record: severity, message, trace keys, then
/// the metadata fields flattened into the same object.
#[derive(Debug)]
pub struct WireRecord<'a> {
    record: &'a LogRecord,
    project_id: Option<&'a str>,
}

impl Serialize for WireRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.record;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(KEY_SEVERITY, &record.severity)?;
        map.serialize_entry(KEY_MESSAGE, &record.message)?;

        if let Some(trace) = &record.trace {
            map.serialize_entry(KEY_TRACE, &trace.resource_name(self.project_id))?;
            if let Some(span_id) = &trace.span_id {
                map.serialize_entry(KEY_SPAN_ID, span_id)?;
            }
            map.serialize_entry(KEY_TRACE_SAMPLED, &trace.sampled)?;
        }

        for (key, value) in &record.fields {
            if is_reserved_key(key) {
                continue;
            }
            map.serialize_entry(key, value)?;
        }

        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_from_level() {
        assert_eq!(Severity::from(&tracing::Level::TRACE), Severity::Debug);
        assert_eq!(Severity::from(&tracing::Level::WARN), Severity::Warning);
        assert_eq!(Severity::from(&tracing::Level::ERROR).as_str(), "ERROR");
    }

    #[test]
    fn test_wire_shape_flattens_fields() {
        let record = LogRecord::new(Severity::Info, "hello")
            .with_field("logField", "custom-entry")
            .with_field("count", 3);

        let value = serde_json::to_value(record.to_wire(None)).unwrap();
        assert_eq!(
            value,
            json!({
                "severity": "INFO",
                "message": "hello",
                "logField": "custom-entry",
                "count": 3
            })
        );
    }

    #[test]
    fn test_wire_shape_with_trace() {
        let trace = TraceContext {
            trace_id: "105445aa7843bc8bf206b12000100000".into(),
            span_id: Some("1".into()),
            sampled: true,
        };
        let record = LogRecord::new(Severity::Warning, "slow").with_trace(Some(trace));

        let value = serde_json::to_value(record.to_wire(Some("demo"))).unwrap();
        assert_eq!(
            value[KEY_TRACE],
            "projects/demo/traces/105445aa7843bc8bf206b12000100000"
        );
        assert_eq!(value[KEY_SPAN_ID], "1");
        assert_eq!(value[KEY_TRACE_SAMPLED], true);
    }

    #[test]
    fn test_reserved_fields_are_dropped() {
        let record = LogRecord::new(Severity::Error, "real message")
            .with_field("message", "spoofed")
            .with_field("severity", "DEBUG")
            .with_field("logging.googleapis.com/trace", "spoofed")
            .with_field("kept", true);

        let value = serde_json::to_value(record.to_wire(None)).unwrap();
        assert_eq!(value["message"], "real message");
        assert_eq!(value["severity"], "ERROR");
        assert!(value.get(KEY_TRACE).is_none());
        assert_eq!(value["kept"], true);
    }
}
