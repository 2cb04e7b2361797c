//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, panic handling, debug tracing)
//!     → request.rs (extract trace context, open request span)
//!     → hello.rs (log two records, respond "Hello, World!")
//!     → Send to client
//! ```

pub mod hello;
pub mod request;
pub mod server;

pub use hello::GREETING;
pub use request::RequestTrace;
pub use server::{AppState, HttpServer};
