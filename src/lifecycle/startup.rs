//! Startup orchestration.
//!
//! Order: logging, signal handler, listener, serve. Any failure before
//! serving is fatal and returned to `main`.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::ShutdownController;
use crate::lifecycle::signals::{ShutdownSignal, SignalError};
use crate::observability::logging::{self, LoggingError};

/// Error type for startup and serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("logging initialization failed: {0}")]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Initialize every subsystem and serve until a signal ends the process.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    let logger = logging::init(&config.observability)?;

    tracing::info!(
        mode = %config.mode,
        debug = config.debug,
        log_level = %config.observability.log_level,
        "hello-logging v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let controller = Arc::new(ShutdownController::for_process(logger.clone()));
    let signals = controller.registry_for(config.mode).install()?;
    tracing::info!(
        signal = ShutdownSignal::for_mode(config.mode).name(),
        "Shutdown handler registered"
    );

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    tokio::spawn(signals.run());

    let server = HttpServer::new(&config, logger);
    server
        .run(listener, std::future::pending())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
