//! API server — HTTP routes, status stream and metrics exporter.

use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;
use crate::ws;
use axum::routing::{get, post};
use axum::Router;
use mailer_core::config::AppConfig;
use std::net::SocketAddr;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the full router. `static_dir` holds `index.html` and frontend assets.
pub fn router(state: AppState, static_dir: &str) -> Router {
    let static_dir = Path::new(static_dir);

    Router::new()
        .route("/send/", post(rest::handle_send))
        .route("/ws", get(ws::handle_ws))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/live", get(rest::liveness))
        // Frontend
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve HTTP until the shutdown flag in the state is raised.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone(), &self.config.api.static_dir);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);
        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(ws::wait_for_shutdown(self.state.shutdown.clone()))
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Start the metrics exporter on a separate port.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
