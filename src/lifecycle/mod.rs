//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Init logging → Register signal handler → Bind listener → Serve
//!
//! Signals (signals.rs):
//!     local mode   → SIGINT only
//!     managed mode → SIGTERM only
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Log "Caught Signal ..." → Flush → exit(0)
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Handlers are registered before the listener binds
//! - Shutdown is immediate; in-flight requests are not drained

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{LifecycleState, ShutdownController};
pub use signals::{ShutdownSignal, SignalRegistry};
