//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Call sites produce:
//!     → tracing macros (info!, warn!, ...)  ─┐
//!     → Logger::emit (arbitrary fields)     ─┤
//!                                            ▼
//!                     logging.rs (CollectorLayer / Logger)
//!                                            │  + trace_context.rs (request trace)
//!                                            ▼
//!                     collector.rs (stdout JSON lines, memory for tests)
//!                                            │
//!                                            ▼
//!                     runtime log agent (external)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace id flows from request headers into every record of that request
//! - One channel per process; initialization is idempotent

pub mod collector;
pub mod logging;
pub mod record;
pub mod trace_context;

pub use collector::{LogCollector, MemoryCollector, SinkError, StdoutCollector};
pub use logging::{Logger, LoggingError};
pub use record::{FieldValue, Fields, LogRecord, Severity};
pub use trace_context::TraceContext;
