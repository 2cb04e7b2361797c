use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hello_logging::config::{load_config, DeploymentMode, LogFormat, Overrides};
use hello_logging::lifecycle::startup;

#[derive(Parser)]
#[command(name = "hello-logging")]
#[command(
    about = "Hello World service with structured logging and signal-driven shutdown",
    long_about = None
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deployment mode: local (SIGINT) or managed (SIGTERM)
    #[arg(long)]
    mode: Option<DeploymentMode>,

    /// Listener address, e.g. localhost:8080
    #[arg(long)]
    bind: Option<String>,

    /// Log filter directive, e.g. info or hello_logging=debug
    #[arg(long)]
    log_level: Option<String>,

    /// Log line format: json or pretty
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Enable development behaviour (rejected in managed mode)
    #[arg(long, conflicts_with = "no_debug")]
    debug: bool,

    /// Disable development behaviour
    #[arg(long)]
    no_debug: bool,
}

impl Cli {
    fn overrides(self) -> Overrides {
        let debug = match (self.debug, self.no_debug) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Overrides {
            config_path: self.config,
            mode: self.mode,
            bind_address: self.bind,
            log_level: self.log_level,
            log_format: self.log_format,
            debug,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.overrides())?;
    startup::run(config).await?;
    Ok(())
}
