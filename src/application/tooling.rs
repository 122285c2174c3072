use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ToolTransportError {
    #[error("notebook service network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("notebook service returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("notebook service returned an invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub input_schema: Option<Value>,
}

#[async_trait]
pub trait NotebookServerInterface: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolTransportError>;

    async fn call_tool(&self, tool: &str, arguments: Value)
    -> Result<Value, ToolTransportError>;
}

/// JSON-RPC client for a remote notebook tool server. One POST per
/// request; responses carry either `result` or `error`.
pub struct HttpNotebookServer {
    http: Client,
    url: String,
    id_counter: AtomicU64,
}

impl HttpNotebookServer {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            http: client,
            url: url.into(),
            id_counter: AtomicU64::new(1),
        }
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolTransportError> {
        let id = self.next_id();
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, request_id = %id, url = %self.url, "Sending request to notebook service");
        let response: Value = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        decode_envelope(response)
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }
}

#[async_trait]
impl NotebookServerInterface for HttpNotebookServer {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolTransportError> {
        let result = self.send_request("tools/list", json!({})).await?;
        let tools = parse_tool_listing(&result)?;
        debug!(tool_count = tools.len(), "Fetched tool catalogue from notebook service");
        Ok(tools)
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, ToolTransportError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            },
        });
        self.send_request("tools/call", params).await
    }
}

fn decode_envelope(response: Value) -> Result<Value, ToolTransportError> {
    if let Some(error) = response.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32000);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(ToolTransportError::Rpc { code, message });
    }

    match response.get("result") {
        Some(result) => Ok(result.clone()),
        None => Err(ToolTransportError::InvalidPayload(
            "response carries neither result nor error".into(),
        )),
    }
}

fn parse_tool_listing(result: &Value) -> Result<Vec<ToolDescriptor>, ToolTransportError> {
    let Some(entries) = result.get("tools").and_then(Value::as_array) else {
        return Err(ToolTransportError::InvalidPayload(
            "tools/list result is missing the tools array".into(),
        ));
    };

    let mut descriptors = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(name) = entry.get("name").and_then(Value::as_str) else {
            warn!("Skipping tool listing entry without a name");
            continue;
        };
        descriptors.push(ToolDescriptor {
            name: name.to_string(),
            description: entry
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            input_schema: entry.get("inputSchema").cloned(),
        });
    }
    Ok(descriptors)
}

/// Pulls the first human-readable text block out of an MCP tool result.
pub fn extract_text_content(result: &Value) -> Option<String> {
    if let Some(blocks) = result.get("content").and_then(Value::as_array) {
        for block in blocks {
            let is_text = block
                .get("type")
                .and_then(Value::as_str)
                .map(|kind| kind.eq_ignore_ascii_case("text"))
                .unwrap_or(false);
            if is_text {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        return Some(trimmed.to_string());
                    }
                }
            }
        }
    }

    if let Some(structured) = result.get("structuredContent").and_then(Value::as_object) {
        if let Some(message) = structured
            .get("error")
            .and_then(Value::as_object)
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
        {
            let trimmed = message.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_with_result_yields_inner_value() {
        let decoded = decode_envelope(json!({"jsonrpc": "2.0", "id": "req-1", "result": {"ok": true}}))
            .expect("result envelope decodes");
        assert_eq!(decoded, json!({"ok": true}));
    }

    #[test]
    fn envelope_with_error_maps_to_rpc_error() {
        let err = decode_envelope(json!({
            "jsonrpc": "2.0",
            "id": "req-2",
            "error": {"code": -32602, "message": "bad params"}
        }))
        .expect_err("error envelope fails");
        match err {
            ToolTransportError::Rpc { code, message } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "bad params");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn envelope_without_result_or_error_is_invalid() {
        let err = decode_envelope(json!({"jsonrpc": "2.0", "id": "req-3"}))
            .expect_err("empty envelope fails");
        assert!(matches!(err, ToolTransportError::InvalidPayload(_)));
    }

    #[test]
    fn tool_listing_collects_descriptors() {
        let tools = parse_tool_listing(&json!({
            "tools": [
                {"name": "createCodeCell", "description": "Append a code cell", "inputSchema": {"type": "object"}},
                {"description": "nameless"},
                {"name": "saveNotebook"}
            ]
        }))
        .expect("listing parses");

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "createCodeCell");
        assert_eq!(tools[0].description.as_deref(), Some("Append a code cell"));
        assert!(tools[0].input_schema.is_some());
        assert_eq!(tools[1].name, "saveNotebook");
        assert!(tools[1].description.is_none());
    }

    #[test]
    fn text_content_prefers_first_text_block() {
        let result = json!({
            "content": [
                {"type": "image", "data": "..."},
                {"type": "text", "text": "  cell created at index 0  "}
            ],
            "isError": false
        });
        assert_eq!(
            extract_text_content(&result).as_deref(),
            Some("cell created at index 0")
        );
    }

    #[test]
    fn text_content_falls_back_to_structured_error() {
        let result = json!({
            "structuredContent": {"error": {"message": "kernel is not running"}}
        });
        assert_eq!(
            extract_text_content(&result).as_deref(),
            Some("kernel is not running")
        );
    }
}
