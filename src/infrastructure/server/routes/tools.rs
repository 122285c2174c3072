use super::super::dto::{ErrorResponse, InvokeToolRequest, InvokeToolResponse, ToolInventoryResponse};
use super::super::state::ServerState;
use crate::application::tooling::NotebookServerInterface;
use crate::model::ModelProvider;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{debug, error, info};

#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    responses(
        (status = 200, description = "Available notebook tools", body = ToolInventoryResponse),
        (status = 502, description = "Notebook service unreachable", body = ErrorResponse)
    )
)]
pub async fn tools_handler<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
) -> Result<Json<ToolInventoryResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.agent().service().list_tools().await {
        Ok(tools) => {
            debug!(tool_count = tools.len(), "Serving /tools request");
            Ok(Json(ToolInventoryResponse { tools }))
        }
        Err(error) => {
            error!(%error, "Failed to list notebook tools");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("failed to list tools: {error}"),
                }),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/tools/call",
    tag = "tools",
    request_body = InvokeToolRequest,
    responses(
        (status = 200, description = "Tool invocation outcome", body = InvokeToolResponse),
        (status = 400, description = "Invalid invocation request", body = ErrorResponse)
    )
)]
pub async fn invoke_tool_handler<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
    Json(payload): Json<InvokeToolRequest>,
) -> Result<Json<InvokeToolResponse>, (StatusCode, Json<ErrorResponse>)> {
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "tool name cannot be empty".to_string(),
            }),
        ));
    }

    info!(tool = payload.name.as_str(), "Direct tool invocation via REST");
    match state
        .agent()
        .service()
        .call_tool(&payload.name, payload.arguments)
        .await
    {
        Ok(result) => Ok(Json(InvokeToolResponse {
            success: true,
            result: Some(result),
            error: None,
        })),
        Err(error) => Ok(Json(InvokeToolResponse {
            success: false,
            result: None,
            error: Some(error.to_string()),
        })),
    }
}
