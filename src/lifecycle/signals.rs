//! OS signal handling.
//!
//! # Responsibilities
//! - Keep one handler per signal kind
//! - Install OS listeners for exactly the registered kinds
//! - Dispatch a received signal to its handler
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Kinds without a handler keep their OS default disposition
//! - Re-registering a kind replaces the previous handler

use std::collections::HashMap;
use std::fmt;
use std::future::poll_fn;
use std::sync::Arc;
use std::task::Poll;

use thiserror::Error;

use crate::config::DeploymentMode;

/// Termination signals the service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShutdownSignal {
    /// SIGINT; Ctrl-C in a terminal.
    Interrupt,
    /// SIGTERM; sent by the orchestrator when stopping a container.
    Terminate,
}

impl ShutdownSignal {
    /// The signal the given deployment mode listens for.
    pub fn for_mode(mode: DeploymentMode) -> Self {
        match mode {
            DeploymentMode::Local => ShutdownSignal::Interrupt,
            DeploymentMode::Managed => ShutdownSignal::Terminate,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
        }
    }

    /// Human-readable description, as `strsignal(3)` words it.
    pub fn description(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "Interrupt",
            ShutdownSignal::Terminate => "Terminated",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Callback run when a registered signal arrives.
pub type SignalHandler = Arc<dyn Fn(ShutdownSignal) + Send + Sync>;

/// Failure to install an OS signal listener.
#[derive(Debug, Error)]
#[error("failed to install {signal} handler: {source}")]
pub struct SignalError {
    pub signal: ShutdownSignal,
    #[source]
    pub source: std::io::Error,
}

/// Handlers keyed by signal kind.
#[derive(Default, Clone)]
pub struct SignalRegistry {
    handlers: HashMap<ShutdownSignal, SignalHandler>,
}

impl fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalRegistry")
            .field("signals", &self.registered())
            .finish()
    }
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `signal`, returning the handler it replaced.
    pub fn register<F>(&mut self, signal: ShutdownSignal, handler: F) -> Option<SignalHandler>
    where
        F: Fn(ShutdownSignal) + Send + Sync + 'static,
    {
        self.handlers.insert(signal, Arc::new(handler))
    }

    /// Registered kinds, in a stable order.
    pub fn registered(&self) -> Vec<ShutdownSignal> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Run the handler for `signal`. Returns false if none is registered.
    pub fn dispatch(&self, signal: ShutdownSignal) -> bool {
        match self.handlers.get(&signal) {
            Some(handler) => {
                handler(signal);
                true
            }
            None => false,
        }
    }

    /// Install OS listeners for every registered kind.
    ///
    /// Must be called inside a Tokio runtime. From this point the
    /// registered signals no longer take their default action.
    pub fn install(self) -> Result<InstalledSignals, SignalError> {
        let mut streams = Vec::new();
        for signal in self.registered() {
            let stream =
                os::listen(signal).map_err(|source| SignalError { signal, source })?;
            streams.push((signal, stream));
        }

        tracing::debug!(signals = ?self.registered(), "Signal handlers installed");

        Ok(InstalledSignals {
            registry: self,
            streams,
        })
    }
}

/// Registry with live OS listeners.
pub struct InstalledSignals {
    registry: SignalRegistry,
    streams: Vec<(ShutdownSignal, os::SignalStream)>,
}

impl InstalledSignals {
    /// Wait for the next registered signal.
    ///
    /// Returns `None` when nothing is registered.
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        if self.streams.is_empty() {
            return None;
        }
        poll_fn(|cx| {
            for (signal, stream) in self.streams.iter_mut() {
                if let Poll::Ready(Some(())) = stream.poll_recv(cx) {
                    return Poll::Ready(Some(*signal));
                }
            }
            Poll::Pending
        })
        .await
    }

    /// Dispatch signals to their handlers until the listeners close.
    pub async fn run(mut self) {
        while let Some(signal) = self.recv().await {
            self.registry.dispatch(signal);
        }
    }

    pub fn registry(&self) -> &SignalRegistry {
        &self.registry
    }
}

#[cfg(unix)]
mod os {
    use super::ShutdownSignal;
    use tokio::signal::unix::{signal, Signal, SignalKind};

    pub type SignalStream = Signal;

    pub fn listen(kind: ShutdownSignal) -> std::io::Result<SignalStream> {
        match kind {
            ShutdownSignal::Interrupt => signal(SignalKind::interrupt()),
            ShutdownSignal::Terminate => signal(SignalKind::terminate()),
        }
    }
}

#[cfg(windows)]
mod os {
    use super::ShutdownSignal;
    use std::task::{Context, Poll};
    use tokio::signal::windows::{ctrl_c, ctrl_shutdown, CtrlC, CtrlShutdown};

    pub enum SignalStream {
        CtrlC(CtrlC),
        Shutdown(CtrlShutdown),
    }

    impl SignalStream {
        pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<()>> {
            match self {
                SignalStream::CtrlC(s) => s.poll_recv(cx),
                SignalStream::Shutdown(s) => s.poll_recv(cx),
            }
        }
    }

    pub fn listen(kind: ShutdownSignal) -> std::io::Result<SignalStream> {
        match kind {
            ShutdownSignal::Interrupt => ctrl_c().map(SignalStream::CtrlC),
            ShutdownSignal::Terminate => ctrl_shutdown().map(SignalStream::Shutdown),
        }
    }
}
