//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide logging channel once
//! - Route every `tracing` event to the configured collector
//! - Accept explicit structured records with arbitrary fields
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging; the collector is a `Layer`
//! - JSON format for production, pretty format for development
//! - Log level configurable via config, `RUST_LOG` overrides it
//! - Delivery is best-effort: failures are counted, never raised

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;
use crate::observability::collector::{LogCollector, SinkError, StdoutCollector};
use crate::observability::record::{FieldValue, Fields, LogRecord, Severity};
use crate::observability::trace_context::TraceContext;

/// Error type for logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log collector unavailable: {0}")]
    Collector(#[from] SinkError),

    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to install global subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Handle to the structured logging channel.
///
/// Cheap to clone; all clones share one collector.
#[derive(Clone, Debug)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

#[derive(Debug)]
struct LoggerInner {
    collector: Arc<dyn LogCollector>,
    dropped: AtomicU64,
}

impl Logger {
    pub fn new(collector: Arc<dyn LogCollector>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                collector,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Emit a record with the given severity, message and metadata.
    pub fn emit(&self, severity: Severity, message: impl Into<String>, fields: Fields) {
        self.emit_record(LogRecord::new(severity, message).with_fields(fields));
    }

    /// Emit a fully built record.
    pub fn emit_record(&self, record: LogRecord) {
        if self.inner.collector.collect(&record).is_err() {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Flush the collector. Errors are counted like dropped records.
    pub fn flush(&self) {
        if self.inner.collector.flush().is_err() {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of records (or flushes) the collector rejected.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Returns true if both handles share the same channel.
    pub fn same_channel(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A `tracing` layer forwarding events into this logger.
    pub fn layer(&self) -> CollectorLayer {
        CollectorLayer {
            logger: self.clone(),
        }
    }
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Initialize logging to stdout in the configured format.
pub fn init(config: &ObservabilityConfig) -> Result<Logger, LoggingError> {
    init_with(
        config,
        Arc::new(StdoutCollector::new(
            config.log_format,
            config.project_id.clone(),
        )),
    )
}

/// Initialize logging with an explicit collector.
///
/// The first successful call installs the global subscriber. Later calls
/// return the installed logger and ignore their arguments.
pub fn init_with(
    config: &ObservabilityConfig,
    collector: Arc<dyn LogCollector>,
) -> Result<Logger, LoggingError> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(logger) = GLOBAL.get() {
        return Ok(logger.clone());
    }

    collector.probe()?;
    let filter = build_filter(&config.log_level)?;
    let logger = Logger::new(collector);

    subscriber(&logger, filter).try_init()?;
    let _ = GLOBAL.set(logger.clone());

    Ok(logger)
}

/// The global logger, once [`init`] has run.
pub fn logger() -> Option<Logger> {
    GLOBAL.get().cloned()
}

/// Emit through the global logger. A no-op before initialization.
pub fn emit(severity: Severity, message: impl Into<String>, fields: Fields) {
    if let Some(logger) = GLOBAL.get() {
        logger.emit(severity, message, fields);
    }
}

/// `RUST_LOG` when set and valid, otherwise the configured directive.
pub fn build_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|source| LoggingError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Subscriber stack used by [`init_with`], exposed so tests can scope one
/// with `tracing::subscriber::with_default`.
pub fn subscriber(logger: &Logger, filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(filter)
        .with(logger.layer())
}

/// Converts `tracing` events into [`LogRecord`]s.
///
/// Spans carrying `trace_id` (and optionally `span_id`, `sampled`) attach
/// that trace to every event recorded inside them.
#[derive(Debug, Clone)]
pub struct CollectorLayer {
    logger: Logger,
}

impl<S> Layer<S> for CollectorLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = SpanTraceVisitor::default();
        attrs.record(&mut visitor);

        if let Some(trace) = visitor.finish() {
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(trace);
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        // Nearest enclosing span with a trace wins.
        let mut trace = None;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(found) = span.extensions().get::<TraceContext>() {
                    trace = Some(found.clone());
                    break;
                }
            }
        }

        let record = LogRecord {
            severity: Severity::from(event.metadata().level()),
            message: visitor.message,
            fields: visitor.fields,
            trace,
        };
        self.logger.emit_record(record);
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Fields,
}

impl EventVisitor {
    fn insert(&mut self, field: &Field, value: FieldValue) {
        // Metadata bridged from the `log` crate.
        if field.name().starts_with("log.") {
            return;
        }
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.insert(field, value.into());
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.insert(field, format!("{:?}", value).into());
        }
    }
}

#[derive(Default)]
struct SpanTraceVisitor {
    trace_id: Option<String>,
    span_id: Option<String>,
    sampled: bool,
}

impl SpanTraceVisitor {
    fn finish(self) -> Option<TraceContext> {
        let trace_id = self.trace_id.filter(|t| !t.is_empty())?;
        Some(TraceContext {
            trace_id,
            span_id: self.span_id.filter(|s| !s.is_empty()),
            sampled: self.sampled,
        })
    }
}

impl Visit for SpanTraceVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "trace_id" => self.trace_id = Some(value.to_string()),
            "span_id" => self.span_id = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "sampled" {
            self.sampled = value;
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "trace_id" | "span_id" => self.record_str(field, &format!("{:?}", value)),
            _ => {}
        }
    }
}
