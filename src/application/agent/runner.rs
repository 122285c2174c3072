use super::errors::AgentError;
use super::gateway::{ModelGateway, ModelUnavailable, PhaseHint, PhaseResponse};
use super::invoker::ToolInvoker;
use super::models::{AgentOptions, TaskReport};
use super::prompts::PromptAssembler;
use super::state::{AgenticState, Phase, log_transition};
use crate::application::tooling::{NotebookServerInterface, ToolDescriptor};
use crate::config::AppConfig;
use crate::model::ModelProvider;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const TASK_PREVIEW_CHARS: usize = 100;
const REPLY_PREVIEW_CHARS: usize = 200;

/// Drives one task through the refinement state machine:
/// ENTRY -> CODE_ATTEMPT -> REFINING -> ROUTING -> {CODE_ATTEMPT | FINISHED}.
/// One `AgenticState` per run; nothing survives between runs.
pub struct Agent<P: ModelProvider> {
    gateway: ModelGateway<P>,
    service: Arc<dyn NotebookServerInterface>,
    prompts: PromptAssembler,
    tool_timeout: Duration,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(
        provider: P,
        service: Arc<dyn NotebookServerInterface>,
        config: &AppConfig,
    ) -> Self {
        let gateway = ModelGateway::new(
            provider,
            config.model.clone(),
            config.system_prompt.clone(),
            Duration::from_secs(config.model_timeout_secs),
            config.decision.clone(),
        );
        Self {
            gateway,
            service,
            prompts: PromptAssembler::new(&config.prompts, config.output_budget),
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
        }
    }

    pub fn service(&self) -> Arc<dyn NotebookServerInterface> {
        Arc::clone(&self.service)
    }

    pub async fn run(
        &self,
        task: String,
        options: AgentOptions,
    ) -> Result<TaskReport, AgentError> {
        if options.max_attempts == 0 {
            return Err(AgentError::Configuration(
                "max_attempts must be greater than zero".into(),
            ));
        }
        if task.trim().is_empty() {
            return Err(AgentError::Configuration("task must not be empty".into()));
        }

        let run_id = Uuid::new_v4().to_string();
        info!(
            run_id = run_id.as_str(),
            task = %preview(&task, TASK_PREVIEW_CHARS),
            max_attempts = options.max_attempts,
            "Agent run started"
        );

        let mut state = AgenticState::new(task);
        state.available_tools = self.fetch_catalog(options.tool_filter.as_deref()).await;
        let invoker = ToolInvoker::new(
            Arc::clone(&self.service),
            &state.available_tools,
            self.tool_timeout,
        );

        let mut phase = Phase::Entry;
        while phase != Phase::Finished {
            if options.cancel.is_cancelled() {
                warn!(run_id = run_id.as_str(), ?phase, "Cancellation observed; no further phase starts");
                return Err(AgentError::Cancelled);
            }
            let next = match phase {
                Phase::Entry => self.entry(&mut state, &options).await,
                Phase::CodeAttempt => self.code_attempt(&mut state, &options, &invoker).await,
                Phase::Refining => self.refining(&mut state, &options).await,
                Phase::Routing => route(&state, options.max_attempts),
                Phase::Finished => Phase::Finished,
            };
            log_transition(phase, next, &state);
            phase = next;
        }

        info!(
            run_id = run_id.as_str(),
            attempts = state.attempts,
            outputs = state.outputs.len(),
            notebook = state.notebook_reference().is_some(),
            "Agent run finished"
        );
        Ok(TaskReport::from_state(run_id, state))
    }

    async fn fetch_catalog(&self, filter: Option<&[String]>) -> Vec<ToolDescriptor> {
        let mut tools = match self.service.list_tools().await {
            Ok(tools) => tools,
            Err(source) => {
                warn!(%source, "Failed to fetch tool catalogue; proceeding without tools");
                Vec::new()
            }
        };

        if let Some(filter) = filter {
            let allowed: HashSet<String> = filter.iter().map(|name| name.to_lowercase()).collect();
            tools.retain(|descriptor| allowed.contains(&descriptor.name.to_lowercase()));
        }
        debug!(tool_count = tools.len(), "Tool catalogue ready");
        tools
    }

    /// ENTRY: rewrite the raw task into an executable goal. A failed or
    /// empty model reply keeps the raw task so the loop stays alive.
    async fn entry(&self, state: &mut AgenticState, options: &AgentOptions) -> Phase {
        let prompt = self.prompts.build(
            Phase::Entry,
            &state.task,
            &state.outputs,
            &state.available_tools,
            state.attempts,
        );
        match self
            .gateway
            .complete(PhaseHint::Entry, options.model.as_deref(), &prompt)
            .await
        {
            Ok(PhaseResponse::RefinedTask(refined)) => {
                info!(refined = %preview(&refined, TASK_PREVIEW_CHARS), "Task refined at entry");
                state.task = refined;
                let note = format!(
                    "Task refined: {}",
                    preview(&state.task, REPLY_PREVIEW_CHARS)
                );
                state.record(note);
            }
            Err(ModelUnavailable(reason)) => {
                warn!(%reason, "Entry refinement unavailable; using the raw task");
                state.record(format!(
                    "Task refinement unavailable ({reason}); continuing with the original task"
                ));
            }
            Ok(_) => {
                state.record(
                    "Task refinement unavailable; continuing with the original task".to_string(),
                );
            }
        }
        Phase::CodeAttempt
    }

    /// CODE_ATTEMPT: ask the model for the next action(s) and execute
    /// every parsed tool call. Exactly one attempt is consumed per cycle
    /// no matter how many calls it contained, including zero.
    async fn code_attempt(
        &self,
        state: &mut AgenticState,
        options: &AgentOptions,
        invoker: &ToolInvoker,
    ) -> Phase {
        let attempt = state.attempts + 1;
        info!(attempt, "Starting code attempt");
        let prompt = self.prompts.build(
            Phase::CodeAttempt,
            &state.task,
            &state.outputs,
            &state.available_tools,
            state.attempts,
        );
        match self
            .gateway
            .complete(PhaseHint::Attempt, options.model.as_deref(), &prompt)
            .await
        {
            Ok(PhaseResponse::Actions { calls, .. }) if !calls.is_empty() => {
                info!(attempt, requested = calls.len(), "Dispatching tool calls");
                // Calls are independent within a batch: dispatch them
                // concurrently, but append outcomes in request order.
                let outcomes = join_all(calls.iter().map(|call| invoker.invoke(call))).await;
                for (call, outcome) in calls.iter().zip(&outcomes) {
                    if let Some(payload) = outcome.payload() {
                        state.absorb_snapshot(payload);
                    }
                    state.record(outcome.render(&call.tool));
                }
            }
            Ok(PhaseResponse::Actions { raw, .. }) => {
                debug!(attempt, "Model response contained no parseable tool call");
                state.record(format!(
                    "Attempt {attempt}: no tool calls requested; model said: {}",
                    preview(&raw, REPLY_PREVIEW_CHARS)
                ));
            }
            Err(ModelUnavailable(reason)) => {
                warn!(attempt, %reason, "Model unavailable during code attempt");
                state.record(format!("Attempt {attempt}: model unavailable ({reason})"));
            }
            Ok(_) => {
                state.record(format!("Attempt {attempt}: model unavailable"));
            }
        }

        state.attempts += 1;
        Phase::Refining
    }

    /// REFINING: ask whether the task needs more work. Anything the
    /// decision parser cannot classify stops the loop; ambiguity must
    /// never keep it spinning.
    async fn refining(&self, state: &mut AgenticState, options: &AgentOptions) -> Phase {
        let prompt = self.prompts.build(
            Phase::Refining,
            &state.task,
            &state.outputs,
            &state.available_tools,
            state.attempts,
        );
        match self
            .gateway
            .complete(PhaseHint::Refine, options.model.as_deref(), &prompt)
            .await
        {
            Ok(PhaseResponse::Decision { signal, raw }) => {
                state.keep_refining = signal.keep_refining;
                if signal.parsed {
                    debug!(
                        keep_refining = signal.keep_refining,
                        reply = %preview(&raw, REPLY_PREVIEW_CHARS),
                        "Refine decision parsed"
                    );
                } else {
                    state.record(format!(
                        "Refine reply was inconclusive; stopping (model said: {})",
                        preview(&raw, REPLY_PREVIEW_CHARS)
                    ));
                }
            }
            Err(ModelUnavailable(reason)) => {
                warn!(%reason, "Refine decision unavailable; stopping");
                state.keep_refining = false;
                state.record(format!("Refine decision unavailable ({reason}); stopping"));
            }
            Ok(_) => {
                state.keep_refining = false;
            }
        }
        Phase::Routing
    }
}

/// ROUTING: pure decision, no I/O. The attempt cap always wins over the
/// latched refine signal.
fn route(state: &AgenticState, max_attempts: usize) -> Phase {
    if state.attempts >= max_attempts {
        info!(
            attempts = state.attempts,
            max_attempts, "Attempt limit reached; finishing"
        );
        Phase::Finished
    } else if state.keep_refining {
        Phase::CodeAttempt
    } else {
        Phase::Finished
    }
}

fn preview(text: &str, max: usize) -> String {
    let collected: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        format!("{collected}...")
    } else {
        collected
    }
}

#[cfg(test)]
mod routing_tests {
    use super::*;

    #[test]
    fn cap_wins_over_keep_refining() {
        let mut state = AgenticState::new("task");
        state.attempts = 3;
        state.keep_refining = true;
        assert_eq!(route(&state, 3), Phase::Finished);
    }

    #[test]
    fn keep_refining_loops_back() {
        let mut state = AgenticState::new("task");
        state.attempts = 1;
        state.keep_refining = true;
        assert_eq!(route(&state, 3), Phase::CodeAttempt);
    }

    #[test]
    fn stop_signal_finishes() {
        let mut state = AgenticState::new("task");
        state.attempts = 1;
        state.keep_refining = false;
        assert_eq!(route(&state, 3), Phase::Finished);
    }
}
