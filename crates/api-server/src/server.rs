//! API server — assembles the CRM routes with operational endpoints and middleware.

use crate::rest::{self, AppState};
use axum::routing::get;
use axum::Router;
use donor_core::config::AppConfig;
use donor_management::{crm_router, CrmStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Main API server serving the CRM REST endpoints.
pub struct ApiServer {
    config: AppConfig,
    store: Arc<CrmStore>,
}

impl ApiServer {
    pub fn new(config: AppConfig, store: Arc<CrmStore>) -> Self {
        Self { config, store }
    }

    /// Full application router: CRM API, probes and middleware.
    pub fn router(&self) -> Router {
        let state = AppState {
            store: self.store.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        let ops = Router::new()
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            .with_state(state);

        Router::new()
            .merge(crm_router(
                self.store.clone(),
                self.config.segmentation.preview_limit,
            ))
            .merge(ops)
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_store_contents() {
        let server = ApiServer::new(AppConfig::default(), Arc::new(CrmStore::with_demo_data()));
        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["node_id"], "crm-01");
        assert_eq!(body["donors"], 6);
        assert_eq!(body["segments"], 3);
    }

    #[tokio::test]
    async fn test_crm_routes_are_mounted() {
        let server = ApiServer::new(AppConfig::default(), Arc::new(CrmStore::new()));
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/donors")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
