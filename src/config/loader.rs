//! Configuration resolution.
//!
//! Layers, lowest precedence first: mode defaults, TOML file, process
//! environment, command-line overrides. The mode itself is resolved
//! first because it decides the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{DeploymentMode, FileConfig, LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Explicit deployment mode ("local" or "managed").
pub const ENV_DEPLOYMENT_MODE: &str = "DEPLOYMENT_MODE";
/// Set by Cloud Run (and Knative) in every managed container.
pub const ENV_K_SERVICE: &str = "K_SERVICE";
/// Port the orchestrator expects the service on.
pub const ENV_PORT: &str = "PORT";
/// Project used to qualify trace ids.
pub const ENV_PROJECT_ID: &str = "GOOGLE_CLOUD_PROJECT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub mode: Option<DeploymentMode>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub debug: Option<bool>,
}

/// Load a partial configuration from a TOML file.
pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Resolve the configuration from the real process environment.
pub fn load_config(overrides: &Overrides) -> Result<ServiceConfig, ConfigError> {
    resolve_config(overrides, |name| std::env::var(name).ok())
}

/// Resolve and validate the configuration.
///
/// `env` looks up environment variables; tests pass a closure over a map.
pub fn resolve_config<E>(overrides: &Overrides, env: E) -> Result<ServiceConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let file = match &overrides.config_path {
        Some(path) => load_file(path)?,
        None => FileConfig::default(),
    };

    let mode = resolve_mode(overrides, &file, &env)?;
    let mut config = ServiceConfig::for_mode(mode);

    // File layer
    if let Some(debug) = file.debug {
        config.debug = debug;
    }
    if let Some(bind) = file.listener.bind_address {
        config.listener.bind_address = bind;
    }
    if let Some(level) = file.observability.log_level {
        config.observability.log_level = level;
    }
    if let Some(format) = file.observability.log_format {
        config.observability.log_format = format;
    }
    if file.observability.project_id.is_some() {
        config.observability.project_id = file.observability.project_id;
    }

    // Environment layer. PORT only means something under an orchestrator;
    // local runs keep the fixed developer address.
    if mode == DeploymentMode::Managed {
        if let Some(port) = env(ENV_PORT) {
            let port: u16 = port.trim().parse().map_err(|e| ConfigError::Env {
                name: ENV_PORT,
                reason: format!("{}", e),
            })?;
            config.listener.bind_address = format!("0.0.0.0:{}", port);
        }
    }
    if let Some(project) = env(ENV_PROJECT_ID) {
        config.observability.project_id = Some(project);
    }

    // Command-line layer
    if let Some(bind) = &overrides.bind_address {
        config.listener.bind_address = bind.clone();
    }
    if let Some(level) = &overrides.log_level {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = overrides.log_format {
        config.observability.log_format = format;
    }
    if let Some(debug) = overrides.debug {
        config.debug = debug;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn resolve_mode<E>(
    overrides: &Overrides,
    file: &FileConfig,
    env: &E,
) -> Result<DeploymentMode, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(mode) = overrides.mode {
        return Ok(mode);
    }
    if let Some(raw) = env(ENV_DEPLOYMENT_MODE) {
        return raw.parse().map_err(|reason| ConfigError::Env {
            name: ENV_DEPLOYMENT_MODE,
            reason,
        });
    }
    if let Some(mode) = file.mode {
        return Ok(mode);
    }
    if env(ENV_K_SERVICE).is_some() {
        return Ok(DeploymentMode::Managed);
    }
    Ok(DeploymentMode::Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_to_local() {
        let config = resolve_config(&Overrides::default(), env_of(&[])).unwrap();
        assert_eq!(config.mode, DeploymentMode::Local);
        assert_eq!(config.listener.bind_address, "localhost:8080");
    }

    #[test]
    fn test_k_service_implies_managed() {
        let config = resolve_config(
            &Overrides::default(),
            env_of(&[("K_SERVICE", "hello"), ("PORT", "9000")]),
        )
        .unwrap();
        assert_eq!(config.mode, DeploymentMode::Managed);
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert!(!config.debug);
    }

    #[test]
    fn test_port_ignored_in_local_mode() {
        let config = resolve_config(&Overrides::default(), env_of(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.listener.bind_address, "localhost:8080");
    }

    #[test]
    fn test_flag_beats_environment() {
        let overrides = Overrides {
            mode: Some(DeploymentMode::Local),
            ..Default::default()
        };
        let config = resolve_config(
            &overrides,
            env_of(&[("DEPLOYMENT_MODE", "managed"), ("K_SERVICE", "hello")]),
        )
        .unwrap();
        assert_eq!(config.mode, DeploymentMode::Local);
    }

    #[test]
    fn test_invalid_mode_env() {
        let err = resolve_config(&Overrides::default(), env_of(&[("DEPLOYMENT_MODE", "cloud")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: ENV_DEPLOYMENT_MODE, .. }));
    }

    #[test]
    fn test_invalid_port() {
        let err = resolve_config(
            &Overrides::default(),
            env_of(&[("K_SERVICE", "hello"), ("PORT", "eighty")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: ENV_PORT, .. }));
    }

    #[test]
    fn test_debug_flag_in_managed_mode_fails() {
        let overrides = Overrides {
            mode: Some(DeploymentMode::Managed),
            debug: Some(true),
            ..Default::default()
        };
        let err = resolve_config(&overrides, env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("managed mode"));
    }

    #[test]
    fn test_file_layer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            mode = "managed"

            [listener]
            bind_address = "127.0.0.1:7070"

            [observability]
            log_level = "warn"
            project_id = "from-file"
            "#
        )
        .unwrap();

        let overrides = Overrides {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let env = env_of(&[("GOOGLE_CLOUD_PROJECT", "from-env")]);
        let config = resolve_config(&overrides, env).unwrap();
        assert_eq!(config.mode, DeploymentMode::Managed);
        assert_eq!(config.listener.bind_address, "127.0.0.1:7070");
        assert_eq!(config.observability.log_level, "warn");
        assert_eq!(config.observability.project_id.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_partial_file_keeps_mode_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[observability]\nlog_format = \"pretty\"").unwrap();

        let overrides = Overrides {
            config_path: Some(file.path().to_path_buf()),
            mode: Some(DeploymentMode::Managed),
            ..Default::default()
        };
        let config = resolve_config(&overrides, env_of(&[])).unwrap();
        let defaults = ServiceConfig::for_mode(DeploymentMode::Managed);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert_eq!(config.listener, defaults.listener);
        assert_eq!(config.observability.log_level, defaults.observability.log_level);
        assert!(!config.debug);
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nport = 9090").unwrap();

        let overrides = Overrides {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = resolve_config(&overrides, env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let overrides = Overrides {
            config_path: Some(PathBuf::from("/nonexistent/hello-logging.toml")),
            ..Default::default()
        };
        let err = resolve_config(&overrides, env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
