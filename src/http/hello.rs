//! Root route.

use axum::extract::State;
use axum::Extension;

use crate::http::request::RequestTrace;
use crate::http::server::AppState;
use crate::observability::{Fields, LogRecord, Severity};

pub const GREETING: &str = "Hello, World!";

/// `GET /`: two log records, then the fixed greeting.
///
/// Both records go straight to the logger, so the log filter never drops them.
pub async fn hello(
    State(state): State<AppState>,
    Extension(RequestTrace(trace)): Extension<RequestTrace>,
) -> &'static str {
    let mut fields = Fields::new();
    fields.insert("logField".into(), "custom-entry".into());
    fields.insert("arbitraryField".into(), "custom-entry".into());
    let message = serde_json::to_string(&fields).unwrap_or_default();

    state.logger.emit_record(
        LogRecord::new(Severity::Info, message)
            .with_fields(fields)
            .with_trace(trace.clone()),
    );

    state.logger.emit_record(
        LogRecord::new(Severity::Info, "Child logger with trace Id.").with_trace(trace),
    );

    GREETING
}
