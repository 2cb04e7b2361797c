//! Log collection backends.
//!
//! A collector receives finished [`LogRecord`]s and hands them to whatever
//! ships logs off the host. In a managed container that is stdout: the
//! runtime's agent parses one JSON object per line. Delivery after that
//! point (buffering, retries, transport) belongs to the agent.

use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::config::LogFormat;
use crate::observability::record::LogRecord;

/// Error raised by a collector.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("collector unreachable: {0}")]
    Unreachable(String),

    #[error("failed to encode log record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write log record: {0}")]
    Io(#[from] io::Error),
}

/// Destination for structured log records.
///
/// Implementations must be safe to call from many request tasks at once.
pub trait LogCollector: Send + Sync + fmt::Debug {
    /// Check the backend can accept records. Called once at startup.
    fn probe(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Deliver one record.
    fn collect(&self, record: &LogRecord) -> Result<(), SinkError>;

    /// Push out anything buffered. Called before the process exits.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes one line per record to stdout.
#[derive(Debug, Clone)]
pub struct StdoutCollector {
    format: LogFormat,
    project_id: Option<String>,
}

impl StdoutCollector {
    pub fn new(format: LogFormat, project_id: Option<String>) -> Self {
        Self { format, project_id }
    }

    /// Render a record as a single line, without the trailing newline.
    pub fn format_line(&self, record: &LogRecord) -> Result<String, SinkError> {
        match self.format {
            LogFormat::Json => Ok(serde_json::to_string(
                &record.to_wire(self.project_id.as_deref()),
            )?),
            LogFormat::Pretty => Ok(pretty_line(record, self.project_id.as_deref())),
        }
    }
}

impl LogCollector for StdoutCollector {
    fn probe(&self) -> Result<(), SinkError> {
        io::stdout()
            .lock()
            .flush()
            .map_err(|e| SinkError::Unreachable(format!("stdout: {}", e)))
    }

    fn collect(&self, record: &LogRecord) -> Result<(), SinkError> {
        let line = self.format_line(record)?;
        // A single locked write keeps concurrent lines from interleaving.
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        io::stdout().lock().flush()?;
        Ok(())
    }
}

fn pretty_line(record: &LogRecord, project_id: Option<&str>) -> String {
    let mut line = format!("{:<8} {}", record.severity.as_str(), record.message);
    for (key, value) in &record.fields {
        let _ = write!(line, " {}={}", key, value);
    }
    if let Some(trace) = &record.trace {
        let _ = write!(line, " trace={}", trace.resource_name(project_id));
    }
    line
}

/// In-memory collector standing in for the external backend in tests.
#[derive(Debug, Default)]
pub struct MemoryCollector {
    records: Mutex<Vec<LogRecord>>,
    failing: AtomicBool,
    unreachable: AtomicBool,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `collect` call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make `probe` fail, as if the backend could not be reached.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Snapshot of the records collected so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }
}

impl LogCollector for MemoryCollector {
    fn probe(&self) -> Result<(), SinkError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SinkError::Unreachable("memory collector disabled".into()));
        }
        Ok(())
    }

    fn collect(&self, record: &LogRecord) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "memory collector failing",
            )));
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}
