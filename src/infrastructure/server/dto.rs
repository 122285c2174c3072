use crate::application::tooling::ToolDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskRequest {
    pub task: String,
    pub model: Option<String>,
    pub max_attempts: Option<usize>,
    pub tool_filter: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToolInventoryResponse {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvokeToolRequest {
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub arguments: Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvokeToolResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub notebook_service_connected: bool,
    pub tool_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigFileResponse {
    pub model: String,
    pub notebook_server_url: String,
    pub system_prompt: Option<String>,
    pub max_attempts: usize,
    pub raw: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfigUpdateRequest {
    pub model: String,
    pub notebook_server_url: String,
    pub system_prompt: Option<String>,
    pub max_attempts: usize,
}
