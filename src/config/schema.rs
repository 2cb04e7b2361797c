//! Configuration schema definitions.
//!
//! `ServiceConfig` is the fully resolved configuration the service runs
//! with. Defaults depend on the deployment mode, so construction goes
//! through [`ServiceConfig::for_mode`]; `FileConfig` is the partial shape
//! accepted from a TOML file and layered on top.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Port used when neither the config file nor `PORT` names one.
pub const DEFAULT_PORT: u16 = 8080;

/// Execution context the process was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Started directly by a developer; stopped with Ctrl-C.
    #[default]
    Local,
    /// Started by a container orchestrator; stopped with SIGTERM.
    Managed,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Local => "local",
            DeploymentMode::Managed => "managed",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(DeploymentMode::Local),
            "managed" => Ok(DeploymentMode::Managed),
            other => Err(format!("unknown deployment mode '{}'", other)),
        }
    }
}

/// Output format for log lines written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, the shape the log agent parses.
    #[default]
    Json,
    /// Human-readable single-line text.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Root configuration for the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Deployment mode; selects the shutdown signal.
    pub mode: DeploymentMode,

    /// Development behaviour: verbose logging, request tracing, panic
    /// details in error responses. Rejected in managed mode.
    pub debug: bool,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServiceConfig {
    /// Defaults for the given deployment mode.
    pub fn for_mode(mode: DeploymentMode) -> Self {
        match mode {
            DeploymentMode::Local => Self {
                mode,
                debug: true,
                listener: ListenerConfig {
                    bind_address: format!("localhost:{}", DEFAULT_PORT),
                },
                observability: ObservabilityConfig {
                    log_level: "hello_logging=debug,tower_http=debug,info".to_string(),
                    log_format: LogFormat::Pretty,
                    project_id: None,
                },
            },
            DeploymentMode::Managed => Self {
                mode,
                debug: false,
                listener: ListenerConfig {
                    bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
                },
                observability: ObservabilityConfig::default(),
            },
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::for_mode(DeploymentMode::default())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    /// Bind address (e.g., "localhost:8080").
    pub bind_address: String,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    /// Filter directive (e.g. "info", "hello_logging=debug").
    pub log_level: String,

    /// Line format written by the stdout collector.
    pub log_format: LogFormat,

    /// Cloud project used to qualify trace ids in log records.
    pub project_id: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            project_id: None,
        }
    }
}

/// Partial configuration as read from a TOML file.
///
/// Every field is optional; present values override the mode defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub mode: Option<DeploymentMode>,
    pub debug: Option<bool>,
    pub listener: FileListenerConfig,
    pub observability: FileObservabilityConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileListenerConfig {
    pub bind_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileObservabilityConfig {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub project_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_defaults() {
        let config = ServiceConfig::for_mode(DeploymentMode::Local);
        assert_eq!(config.listener.bind_address, "localhost:8080");
        assert!(config.debug);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_managed_defaults() {
        let config = ServiceConfig::for_mode(DeploymentMode::Managed);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(!config.debug);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Managed".parse::<DeploymentMode>(), Ok(DeploymentMode::Managed));
        assert_eq!(" local ".parse::<DeploymentMode>(), Ok(DeploymentMode::Local));
        assert!("cloud".parse::<DeploymentMode>().is_err());
    }

    #[test]
    fn test_file_config_partial() {
        let file: FileConfig = toml::from_str(
            r#"
            mode = "managed"

            [observability]
            project_id = "demo-project"
            "#,
        )
        .unwrap();
        assert_eq!(file.mode, Some(DeploymentMode::Managed));
        assert_eq!(file.observability.project_id.as_deref(), Some("demo-project"));
        assert!(file.listener.bind_address.is_none());
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        let result: Result<FileConfig, _> = toml::from_str("listen = \"x\"");
        assert!(result.is_err());
    }
}
