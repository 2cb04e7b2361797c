//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject development behaviour in the managed deployment path
//! - Check the log filter directive parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::{DeploymentMode, ServiceConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address must not be empty")]
    EmptyBindAddress,

    #[error("observability.log_level '{directive}' is not a valid filter: {reason}")]
    InvalidLogLevel { directive: String, reason: String },

    #[error("observability.project_id must not be empty when set")]
    EmptyProjectId,

    #[error("debug behaviour must not be enabled in managed mode")]
    DebugInManagedMode,
}

/// Validate a resolved configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }

    if let Err(e) = EnvFilter::try_new(&config.observability.log_level) {
        errors.push(ValidationError::InvalidLogLevel {
            directive: config.observability.log_level.clone(),
            reason: e.to_string(),
        });
    }

    if let Some(project) = &config.observability.project_id {
        if project.trim().is_empty() {
            errors.push(ValidationError::EmptyProjectId);
        }
    }

    if config.debug && config.mode == DeploymentMode::Managed {
        errors.push(ValidationError::DebugInManagedMode);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
