use super::models::ToolCallRequest;
use super::parser::{RefineSignal, parse_refine_decision, parse_tool_calls};
use crate::config::DecisionConfig;
use crate::model::{ModelProvider, ModelRequest};
use crate::types::ChatMessage;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// The only error class the state machine has to handle: the model call
/// could not produce usable content. Every phase recovers from it locally.
#[derive(Debug, Error)]
#[error("model unavailable: {0}")]
pub struct ModelUnavailable(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseHint {
    Entry,
    Attempt,
    Refine,
}

#[derive(Debug)]
pub enum PhaseResponse {
    RefinedTask(String),
    Actions {
        calls: Vec<ToolCallRequest>,
        raw: String,
    },
    Decision {
        signal: RefineSignal,
        raw: String,
    },
}

pub struct ModelGateway<P: ModelProvider> {
    provider: P,
    model: String,
    system_prompt: Option<String>,
    timeout: Duration,
    decision: DecisionConfig,
}

impl<P: ModelProvider> ModelGateway<P> {
    pub fn new(
        provider: P,
        model: impl Into<String>,
        system_prompt: Option<String>,
        timeout: Duration,
        decision: DecisionConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt,
            timeout,
            decision,
        }
    }

    pub async fn complete(
        &self,
        hint: PhaseHint,
        model_override: Option<&str>,
        context: &str,
    ) -> Result<PhaseResponse, ModelUnavailable> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(context));

        let request = ModelRequest {
            model: model_override.unwrap_or(&self.model).to_string(),
            messages,
        };

        let response = tokio::time::timeout(self.timeout, self.provider.chat(request))
            .await
            .map_err(|_| {
                ModelUnavailable(format!(
                    "call timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| ModelUnavailable(err.to_string()))?;

        let content = response.message.content.trim().to_string();
        if content.is_empty() {
            return Err(ModelUnavailable("model returned empty content".into()));
        }
        debug!(?hint, response_chars = content.len(), "Model response received");

        Ok(match hint {
            PhaseHint::Entry => PhaseResponse::RefinedTask(content),
            PhaseHint::Attempt => PhaseResponse::Actions {
                calls: parse_tool_calls(&content),
                raw: content,
            },
            PhaseHint::Refine => PhaseResponse::Decision {
                signal: parse_refine_decision(
                    &content,
                    &self.decision.continue_tokens,
                    &self.decision.stop_tokens,
                ),
                raw: content,
            },
        })
    }
}
