use super::super::dto::{ErrorResponse, TaskRequest};
use super::super::state::ServerState;
use crate::agent::{AgentError, AgentOptions, TaskReport};
use crate::model::ModelProvider;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{error, info};

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    request_body = TaskRequest,
    responses(
        (status = 200, description = "Task run completed", body = TaskReport),
        (status = 400, description = "Invalid task submission", body = ErrorResponse),
        (status = 502, description = "Task run could not complete", body = ErrorResponse)
    )
)]
pub async fn submit_task_handler<P: ModelProvider>(
    State(state): State<Arc<ServerState<P>>>,
    Json(payload): Json<TaskRequest>,
) -> Result<Json<TaskReport>, (StatusCode, Json<ErrorResponse>)> {
    info!(
        max_attempts = ?payload.max_attempts,
        filtered = payload.tool_filter.is_some(),
        "Received /tasks request"
    );

    if payload.task.trim().is_empty() {
        error!("Rejecting /tasks request due to empty task");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "task cannot be empty".to_string(),
            }),
        ));
    }

    let options = AgentOptions {
        model: payload.model,
        max_attempts: payload
            .max_attempts
            .unwrap_or_else(|| state.default_max_attempts()),
        tool_filter: payload.tool_filter,
        ..AgentOptions::default()
    };

    match state.agent().run(payload.task, options).await {
        Ok(report) => {
            info!(
                run_id = report.run_id.as_str(),
                attempts = report.attempts,
                "Task run completed"
            );
            Ok(Json(report))
        }
        Err(error @ AgentError::Configuration(_)) => {
            error!(%error, "Task rejected before entry");
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: error.user_message(),
                }),
            ))
        }
        Err(error) => {
            error!(%error, "Task run failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: error.user_message(),
                }),
            ))
        }
    }
}
