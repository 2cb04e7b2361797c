//! hello-logging
//!
//! A single-route HTTP service that writes structured, trace-correlated
//! log records and exits cleanly on the termination signal of its
//! deployment mode.
//!
//! ```text
//!   process start
//!       │
//!       ▼
//!   config ──▶ observability::logging::init ──▶ lifecycle::signals
//!                         │                          │ (SIGINT local,
//!                         │                          │  SIGTERM managed)
//!                         ▼                          ▼
//!   GET / ──▶ http (trace span) ──▶ 2 records    "Caught Signal ..." ──▶ exit(0)
//!                         │
//!                         ▼
//!                  stdout JSON lines ──▶ runtime log agent
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::ShutdownController;
pub use observability::Logger;
