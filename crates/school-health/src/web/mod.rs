//! Web layer module
//!
//! HTTP interface of the school health service. Handlers stay thin: uploads
//! go to the [`EnrollmentImporter`], lookups go straight to the repositories.
//!
//! # Layout
//!
//! - **Handlers**: request handlers organized by domain
//! - **Responses**: the [`ApiResponse`] envelope and error mapping
//! - **Extractors**: identity headers and query parameters
//! - **Middleware**: request logging

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use std::net::SocketAddr;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::{Config, WebConfig},
    database::Database,
    import::EnrollmentImporter,
    services::ProgressService,
};

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod responses;

pub use extractors::AuthenticatedUser;
pub use responses::{ApiResponse, handle_error};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
    pub importer: EnrollmentImporter,
    pub progress_service: ProgressService,
}

impl AppState {
    pub fn new(database: Database, config: Config) -> Self {
        let importer = EnrollmentImporter::new(database.connection(), config.import.clone());
        let progress_service = ProgressService::new(config.import.progress_channel_capacity);
        Self {
            database,
            config,
            importer,
            progress_service,
        }
    }
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.config.web.host, state.config.web.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    state.config.web.host, state.config.web.port
                )
            })?;

        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    /// Bind, report readiness through `ready_signal`, then serve until SIGINT or SIGTERM
    pub async fn serve_with_signal(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        let listener = match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => listener,
            Err(bind_error) => {
                let message = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", message)));
                return Err(anyhow::anyhow!("{}", message));
            }
        };

        let _ = ready_signal.send(Ok(()));
        info!("Listening on http://{}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Web server stopped");
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Build the full router for `state`
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.import.max_file_size + MULTIPART_OVERHEAD_BYTES;
    let cors = cors_layer(&state.config.web);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/live", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api/v1", api_v1_routes())
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi::ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware::request_logging_middleware,
        ))
        .with_state(state)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/imports/enrollments",
            post(handlers::imports::import_enrollments),
        )
        .route(
            "/imports/enrollments/validate",
            post(handlers::imports::validate_enrollment_file),
        )
        .route(
            "/imports/progress",
            get(handlers::imports::list_import_progress),
        )
        .route(
            "/imports/progress/events",
            get(handlers::imports::import_progress_events),
        )
        .route("/schools", get(handlers::schools::list_schools))
        .route("/schools/{code}", get(handlers::schools::get_school))
        .route("/students/{id}", get(handlers::students::get_student))
}

fn cors_layer(config: &WebConfig) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                    _ = sigint.recv() => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
                }
            }
            _ => {
                warn!("Could not install signal handlers, falling back to Ctrl+C");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
