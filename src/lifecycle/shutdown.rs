//! Shutdown coordination.
//!
//! ```text
//! RUNNING ──signal──▶ SHUTTING_DOWN ──log, exit(0)──▶ TERMINATED
//! ```
//!
//! Single-shot: the first signal wins, later ones are ignored, and there
//! is no way back to `Running`. In-flight requests are not drained.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::DeploymentMode;
use crate::lifecycle::signals::{ShutdownSignal, SignalRegistry};
use crate::observability::{LogRecord, Logger, Severity};

/// Exit status reported after a signal-driven shutdown.
pub const EXIT_SUCCESS: i32 = 0;

/// Lifecycle state of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Running = 0,
    ShuttingDown = 1,
    Terminated = 2,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Running,
            1 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Terminated,
        }
    }
}

type ExitFn = Box<dyn Fn(i32) + Send + Sync>;

/// Turns a termination signal into a logged, clean exit.
pub struct ShutdownController {
    state: AtomicU8,
    logger: Logger,
    exit: ExitFn,
}

impl std::fmt::Debug for ShutdownController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownController")
            .field("state", &self.state())
            .finish()
    }
}

impl ShutdownController {
    /// Controller that logs through `logger`, then calls `exit` with the
    /// status code once shut down.
    pub fn new<F>(logger: Logger, exit: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        Self {
            state: AtomicU8::new(LifecycleState::Running as u8),
            logger,
            exit: Box::new(exit),
        }
    }

    /// Controller that terminates the process.
    pub fn for_process(logger: Logger) -> Self {
        Self::new(logger, |code| {
            std::process::exit(code);
        })
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Log the received signal and exit with status 0.
    ///
    /// The record bypasses the log filter: it is written at any level.
    ///
    /// Returns false without doing anything if a shutdown is already under way.
    pub fn handle_shutdown(&self, signal: ShutdownSignal) -> bool {
        if self
            .state
            .compare_exchange(
                LifecycleState::Running as u8,
                LifecycleState::ShuttingDown as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return false;
        }

        self.logger.emit_record(
            LogRecord::new(
                Severity::Info,
                format!("Caught Signal {}", signal.description()),
            )
            .with_field("signal", signal.name()),
        );
        self.logger.flush();

        self.state
            .store(LifecycleState::Terminated as u8, Ordering::SeqCst);
        (self.exit)(EXIT_SUCCESS);
        true
    }

    /// Registry holding this controller's handler for the mode's signal only.
    pub fn registry_for(self: &Arc<Self>, mode: DeploymentMode) -> SignalRegistry {
        let mut registry = SignalRegistry::new();
        let controller = Arc::clone(self);
        registry.register(ShutdownSignal::for_mode(mode), move |signal| {
            controller.handle_shutdown(signal);
        });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::subscriber;
    use crate::observability::{FieldValue, MemoryCollector};
    use std::sync::Mutex;
    use tracing_subscriber::EnvFilter;

    struct Recorder {
        controller: Arc<ShutdownController>,
        collector: Arc<MemoryCollector>,
        logger: Logger,
        codes: Arc<Mutex<Vec<i32>>>,
    }

    fn recording_controller() -> Recorder {
        let codes = Arc::new(Mutex::new(Vec::new()));
        let collector = Arc::new(MemoryCollector::new());
        let logger = Logger::new(collector.clone());
        let sink = codes.clone();
        let controller = Arc::new(ShutdownController::new(logger.clone(), move |code| {
            sink.lock().unwrap().push(code);
        }));
        Recorder {
            controller,
            collector,
            logger,
            codes,
        }
    }

    #[test]
    fn test_shutdown_logs_and_exits_zero() {
        let r = recording_controller();

        assert_eq!(r.controller.state(), LifecycleState::Running);
        assert!(r.controller.handle_shutdown(ShutdownSignal::Interrupt));

        assert_eq!(r.controller.state(), LifecycleState::Terminated);
        assert_eq!(*r.codes.lock().unwrap(), vec![0]);
        let records = r.collector.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Caught Signal Interrupt");
        assert_eq!(records[0].severity, Severity::Info);
        assert_eq!(records[0].fields["signal"], FieldValue::String("SIGINT".into()));
    }

    #[test]
    fn test_shutdown_record_survives_warn_filter() {
        let r = recording_controller();
        let filter = EnvFilter::new("warn");

        tracing::subscriber::with_default(subscriber(&r.logger, filter), || {
            assert!(r.controller.handle_shutdown(ShutdownSignal::Terminate));
        });

        assert_eq!(r.collector.messages(), vec!["Caught Signal Terminated".to_string()]);
        assert_eq!(*r.codes.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_second_signal_is_ignored() {
        let r = recording_controller();
        assert!(r.controller.handle_shutdown(ShutdownSignal::Terminate));
        assert!(!r.controller.handle_shutdown(ShutdownSignal::Terminate));
        assert_eq!(r.codes.lock().unwrap().len(), 1);
        assert_eq!(r.collector.records().len(), 1);
    }

    #[test]
    fn test_registry_per_mode() {
        let r = recording_controller();

        let local = r.controller.registry_for(DeploymentMode::Local);
        assert_eq!(local.registered(), vec![ShutdownSignal::Interrupt]);

        let managed = r.controller.registry_for(DeploymentMode::Managed);
        assert_eq!(managed.registered(), vec![ShutdownSignal::Terminate]);
        assert!(!managed.dispatch(ShutdownSignal::Interrupt));
        assert!(r.codes.lock().unwrap().is_empty());

        assert!(managed.dispatch(ShutdownSignal::Terminate));
        assert_eq!(*r.codes.lock().unwrap(), vec![0]);
    }
}
