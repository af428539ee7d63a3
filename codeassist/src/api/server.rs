//! API server for codeassist

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::orchestrator::CodeAssistant;

use super::routes::{device, generate, health_check, refresh, stats, AppState};

/// Configuration for the API server
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    assistant: Arc<CodeAssistant>,
}

impl ApiServer {
    /// Create a new API server with configuration
    pub fn new(config: ApiServerConfig, assistant: Arc<CodeAssistant>) -> Self {
        Self { config, assistant }
    }

    /// Create a new API server with default configuration
    pub fn with_defaults(assistant: Arc<CodeAssistant>) -> Self {
        Self::new(ApiServerConfig::default(), assistant)
    }

    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            assistant: Arc::clone(&self.assistant),
        });

        Router::new()
            .route("/health", get(health_check))
            .route("/api/generate", post(generate))
            .route("/api/refresh", post(refresh))
            .route("/api/device", get(device))
            .route("/api/stats", get(stats))
            .with_state(app_state)
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until the process stops
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        info!("Starting API server on {}", listener.local_addr()?);

        let app = self.router();
        axum::serve(listener, app).await?;

        Ok(())
    }
}
