use super::super::dto::HealthResponse;
use super::super::state::ServerState;
use crate::application::tooling::NotebookServerInterface;
use crate::model::ModelProvider;
use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health_handler<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
) -> Json<HealthResponse> {
    let (connected, tool_count) = match state.agent().service().list_tools().await {
        Ok(tools) => (true, tools.len()),
        Err(_) => (false, 0),
    };
    debug!(connected, tool_count, "Serving /health request");
    Json(HealthResponse {
        status: "healthy".to_string(),
        notebook_service_connected: connected,
        tool_count,
    })
}
