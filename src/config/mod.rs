//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! mode default (local | managed)
//!     → config file (TOML, optional)   loader.rs
//!     → environment (PORT, K_SERVICE, ...)
//!     → command-line flags
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Deployment mode is resolved first; it picks the defaults
//! - Config is immutable once loaded
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError, Overrides};
pub use schema::{DeploymentMode, ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig};
