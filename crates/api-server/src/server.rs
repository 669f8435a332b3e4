//! API server — HTTP routes, middleware, and the Prometheus exporter.

use crate::auth::{SessionResolver, StaticSessions};
use crate::rest::{self, AppState};
use crate::retention_rest;
use crate::swagger::ApiDoc;
use axum::routing::get;
use axum::Router;
use nexus_core::config::AppConfig;
use nexus_reporting::RetentionCalculator;
use nexus_store::AnalyticsStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    /// Build a server over `store`, authenticating with the configured sessions.
    pub fn new(config: AppConfig, store: Arc<dyn AnalyticsStore>) -> Self {
        let sessions: Arc<dyn SessionResolver> = Arc::new(StaticSessions::from_config(&config.auth));
        let state = AppState {
            calculator: Arc::new(RetentionCalculator::new(store)),
            sessions,
            cookie_name: config.auth.cookie_name.clone(),
            instance_id: config.instance_id.clone(),
            start_time: Instant::now(),
        };
        Self { config, state }
    }

    /// Replace the session resolver.
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionResolver>) -> Self {
        self.state.sessions = sessions;
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/analytics/retention", get(retention_rest::handle_retention))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            // Middleware
            .layer(TimeoutLayer::new(Duration::from_millis(
                self.config.api.request_timeout_ms,
            )))
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the HTTP server. Returns after a Ctrl-C triggered graceful shutdown.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
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

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
