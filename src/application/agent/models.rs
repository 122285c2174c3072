use super::state::AgenticState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

pub(crate) const DEFAULT_MAX_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub model: Option<String>,
    pub max_attempts: usize,
    pub tool_filter: Option<Vec<String>>,
    pub cancel: CancellationToken,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            model: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            tool_filter: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// One tool invocation requested by the model during a code attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub tool: String,
    pub arguments: Value,
}

/// Externally visible result of a task run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskReport {
    pub run_id: String,
    pub success: bool,
    pub task: String,
    pub outputs: Vec<String>,
    pub attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notebook_reference: Option<String>,
    #[schema(value_type = String)]
    pub completed_at: DateTime<Utc>,
}

impl TaskReport {
    pub(crate) fn from_state(run_id: String, state: AgenticState) -> Self {
        let notebook_reference = state.notebook_reference();
        Self {
            run_id,
            success: true,
            task: state.task,
            outputs: state.outputs,
            attempts: state.attempts,
            notebook_reference,
            completed_at: Utc::now(),
        }
    }
}
