//! API routes for the codeassist server

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use codeassist_core::{AssistError, OperationSummary, SystemReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::orchestrator::{AssistantStats, CodeAssistant, CodeRequest, CodeResponse};

/// Application state
pub struct AppState {
    pub assistant: Arc<CodeAssistant>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct RefreshResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub caches: AssistantStats,
    pub timings: Vec<OperationSummary>,
}

/// Error body: `{"error": kind, "message": ...}`
#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Request-scoped failure rendered as JSON
pub struct ApiError(pub AssistError);

impl From<AssistError> for ApiError {
    fn from(e: AssistError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AssistError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AssistError::ConstructionFailure(_)
            | AssistError::RetrievalFailure(_)
            | AssistError::GenerationFailure(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Generate code for one request
pub async fn generate(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    let response = app_state.assistant.handle(request).await?;
    Ok(Json(response))
}

/// Rebuild the documentation index
pub async fn refresh(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    app_state.assistant.refresh_documents().await?;
    Ok(Json(RefreshResponse {
        status: "refreshed".to_string(),
    }))
}

/// Host load and accelerator status
pub async fn device(State(app_state): State<Arc<AppState>>) -> Json<SystemReport> {
    Json(app_state.assistant.device_report().await)
}

pub async fn stats(State(app_state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        caches: app_state.assistant.cache_stats().await,
        timings: app_state.assistant.timing_summary(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AssistError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (AssistError::ConstructionFailure("x".into()), StatusCode::BAD_GATEWAY),
            (AssistError::RetrievalFailure("x".into()), StatusCode::BAD_GATEWAY),
            (AssistError::GenerationFailure("x".into()), StatusCode::BAD_GATEWAY),
            (AssistError::Other("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError(error).into_response().status(), status);
        }
    }
}
