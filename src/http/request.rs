//! Request context.
//!
//! # Responsibilities
//! - Extract the trace context from incoming headers
//! - Make it available to handlers as a request extension
//! - Run the rest of the request inside a span carrying it
//!
//! # Design Decisions
//! - Trace context is extracted as early as possible
//! - The extension is always present, `None` when no header matched

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use crate::observability::TraceContext;

/// Trace context of the current request, inserted by [`trace_context`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTrace(pub Option<TraceContext>);

/// Middleware attaching [`RequestTrace`] and a `request` span.
pub async fn trace_context(mut request: Request, next: Next) -> Response {
    let trace = TraceContext::from_headers(request.headers());

    let span = match &trace {
        Some(ctx) => tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            trace_id = ctx.trace_id.as_str(),
            span_id = ctx.span_id.as_deref().unwrap_or_default(),
            sampled = ctx.sampled,
        ),
        None => tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
        ),
    };

    request.extensions_mut().insert(RequestTrace(trace));
    next.run(request).instrument(span).await
}
