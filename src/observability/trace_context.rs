//! Distributed trace context.
//!
//! # Responsibilities
//! - Extract trace context from incoming request headers
//! - Render the trace id the way the log collector correlates it
//!
//! # Design Decisions
//! - `X-Cloud-Trace-Context` wins; it is what the managed load balancer sets
//! - W3C `traceparent` is accepted as a fallback
//! - Malformed headers are ignored, never an error

use axum::http::HeaderMap;

pub const CLOUD_TRACE_HEADER: &str = "x-cloud-trace-context";
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Trace identity of the request a record was emitted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// 32 lowercase hex characters.
    pub trace_id: String,
    pub span_id: Option<String>,
    pub sampled: bool,
}

impl TraceContext {
    /// Extract from request headers, preferring the Cloud header.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        header(CLOUD_TRACE_HEADER)
            .and_then(Self::parse_cloud_trace)
            .or_else(|| header(TRACEPARENT_HEADER).and_then(Self::parse_traceparent))
    }

    /// Parse `TRACE_ID[/SPAN_ID][;o=FLAG]`.
    pub fn parse_cloud_trace(value: &str) -> Option<Self> {
        let (ids, options) = match value.trim().split_once(';') {
            Some((ids, options)) => (ids, Some(options)),
            None => (value.trim(), None),
        };

        let (trace_id, span_id) = match ids.split_once('/') {
            Some((trace, span)) => (trace, Some(span)),
            None => (ids, None),
        };

        if !is_hex_id(trace_id, 32) {
            return None;
        }

        let span_id = match span_id {
            Some(span) if !span.is_empty() => {
                span.parse::<u64>().ok()?;
                Some(span.to_string())
            }
            _ => None,
        };

        let sampled = options
            .and_then(|o| o.trim().strip_prefix("o="))
            .map(|flag| flag.trim() == "1")
            .unwrap_or(false);

        Some(Self {
            trace_id: trace_id.to_ascii_lowercase(),
            span_id,
            sampled,
        })
    }

    /// Parse `VERSION-TRACE_ID-PARENT_ID-FLAGS`.
    pub fn parse_traceparent(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let parent_id = parts.next()?;
        let flags = parts.next()?;

        if version == "ff" || !is_hex_id(version, 2) || !is_hex_id(flags, 2) {
            return None;
        }
        // Version 00 has exactly four fields.
        if version == "00" && parts.next().is_some() {
            return None;
        }
        if !is_hex_id(trace_id, 32) || !is_hex_id(parent_id, 16) {
            return None;
        }

        let flags = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_ascii_lowercase(),
            span_id: Some(parent_id.to_ascii_lowercase()),
            sampled: flags & 0x01 == 0x01,
        })
    }

    /// Trace value as written to a record.
    ///
    /// With a project the collector expects the full resource name.
    pub fn resource_name(&self, project_id: Option<&str>) -> String {
        match project_id {
            Some(project) => format!("projects/{}/traces/{}", project, self.trace_id),
            None => self.trace_id.clone(),
        }
    }
}

/// Hex of exactly `len` characters, not all zeros.
fn is_hex_id(value: &str, len: usize) -> bool {
    value.len() == len
        && value.bytes().all(|b| b.is_ascii_hexdigit())
        && (len <= 2 || value.bytes().any(|b| b != b'0'))
}
