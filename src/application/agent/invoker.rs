use super::models::ToolCallRequest;
use crate::application::tooling::{
    NotebookServerInterface, ToolDescriptor, extract_text_content,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Normalized result of one tool invocation. Failures are data, not
/// errors: every transport or validation problem becomes a `Failure`
/// message fit for the run log.
#[derive(Debug)]
pub enum ToolOutcome {
    Success {
        payload: Value,
        message: Option<String>,
    },
    Failure(String),
}

impl ToolOutcome {
    pub fn render(&self, tool: &str) -> String {
        match self {
            ToolOutcome::Success { payload, message } => {
                let detail = message
                    .clone()
                    .unwrap_or_else(|| serde_json::to_string(payload).unwrap_or_default());
                format!("Tool '{tool}' succeeded: {detail}")
            }
            ToolOutcome::Failure(reason) => format!("Tool '{tool}' failed: {reason}"),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            ToolOutcome::Success { payload, .. } => Some(payload),
            ToolOutcome::Failure(_) => None,
        }
    }
}

pub struct ToolInvoker {
    service: Arc<dyn NotebookServerInterface>,
    index: HashMap<String, ToolDescriptor>,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(
        service: Arc<dyn NotebookServerInterface>,
        catalog: &[ToolDescriptor],
        timeout: Duration,
    ) -> Self {
        let index = catalog
            .iter()
            .map(|descriptor| (descriptor.name.to_lowercase(), descriptor.clone()))
            .collect();
        Self {
            service,
            index,
            timeout,
        }
    }

    pub async fn invoke(&self, call: &ToolCallRequest) -> ToolOutcome {
        let Some(descriptor) = self.index.get(&call.tool.to_lowercase()) else {
            warn!(requested_tool = %call.tool, "Unknown tool requested by model");
            return ToolOutcome::Failure(format!("unknown tool: {}", call.tool));
        };

        let arguments = match call.arguments.clone() {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        if let Err(reason) = check_arguments(descriptor, &arguments) {
            warn!(tool = %descriptor.name, %reason, "Rejecting tool call before dispatch");
            return ToolOutcome::Failure(reason);
        }

        let dispatch = self.service.call_tool(&descriptor.name, arguments);
        let payload = match tokio::time::timeout(self.timeout, dispatch).await {
            Err(_) => {
                warn!(tool = %descriptor.name, "Tool call timed out");
                return ToolOutcome::Failure(format!(
                    "tool '{}' timed out after {}s",
                    descriptor.name,
                    self.timeout.as_secs()
                ));
            }
            Ok(Err(source)) => {
                warn!(tool = %descriptor.name, %source, "Tool call failed");
                return ToolOutcome::Failure(source.to_string());
            }
            Ok(Ok(payload)) => payload,
        };

        let is_error = payload
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let message = extract_text_content(&payload);
        info!(tool = %descriptor.name, success = !is_error, "Tool executed");

        if is_error {
            ToolOutcome::Failure(
                message.unwrap_or_else(|| format!("tool '{}' reported an error", descriptor.name)),
            )
        } else {
            ToolOutcome::Success { payload, message }
        }
    }
}

/// Shallow validation against the descriptor's input schema: arguments
/// must be an object and carry every `required` key. Full JSON Schema
/// enforcement stays on the server side.
fn check_arguments(descriptor: &ToolDescriptor, arguments: &Value) -> Result<(), String> {
    let Some(schema) = &descriptor.input_schema else {
        return Ok(());
    };

    let expects_object = schema
        .get("type")
        .and_then(Value::as_str)
        .map(|kind| kind == "object")
        .unwrap_or(true);
    let Some(fields) = arguments.as_object() else {
        if expects_object {
            return Err(format!(
                "arguments for tool '{}' must be a JSON object",
                descriptor.name
            ));
        }
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !fields.contains_key(key) {
                return Err(format!(
                    "tool '{}' is missing required argument '{key}'",
                    descriptor.name
                ));
            }
        }
    }
    Ok(())
}
