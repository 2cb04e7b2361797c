//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the root handler
//! - Wire up middleware (trace context, panic handling, debug tracing)
//! - Bind server to listener

use std::any::Any;
use std::future::Future;

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::{CatchPanicLayer, ResponseForPanic},
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::hello::hello;
use crate::http::request::trace_context;
use crate::observability::Logger;

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub logger: Logger,
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ServiceConfig, logger: Logger) -> Self {
        let router = Self::build_router(config.debug, AppState { logger });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(debug: bool, state: AppState) -> Router {
        let router = Router::new()
            .route("/", get(hello))
            .with_state(state);
        apply_layers(router, debug)
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

pub(crate) fn apply_layers(router: Router, debug: bool) -> Router {
    let router = router.layer(middleware::from_fn(trace_context));
    let router = if debug {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.layer(CatchPanicLayer::custom(PanicResponse { debug }))
}

/// Renders a handler panic as a 500. Debug mode includes the panic message.
#[derive(Debug, Clone, Copy)]
struct PanicResponse {
    debug: bool,
}

impl ResponseForPanic for PanicResponse {
    type ResponseBody = Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> Response<Self::ResponseBody> {
        let detail = if let Some(s) = err.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = err.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic payload".to_string()
        };

        tracing::error!(panic = %detail, "Request handler panicked");

        let body = if self.debug {
            format!("Internal Server Error\n\n{}", detail)
        } else {
            "Internal Server Error".to_string()
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
