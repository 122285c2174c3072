use crate::application::tooling::ToolDescriptor;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Entry,
    CodeAttempt,
    Refining,
    Routing,
    Finished,
}

/// Working state of a single task run. Created per run, dropped once the
/// report is assembled; never shared between runs.
#[derive(Debug)]
pub struct AgenticState {
    pub task: String,
    pub outputs: Vec<String>,
    pub attempts: usize,
    pub keep_refining: bool,
    pub available_tools: Vec<ToolDescriptor>,
    pub notebook_snapshot: Option<Value>,
}

impl AgenticState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            outputs: Vec::new(),
            attempts: 0,
            keep_refining: true,
            available_tools: Vec::new(),
            notebook_snapshot: None,
        }
    }

    /// Appends to the run log. The log is append-only: entries are never
    /// rewritten or reordered once recorded.
    pub fn record(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!(outputs = self.outputs.len() + 1, "Recording run output");
        self.outputs.push(entry);
    }

    /// Opportunistically remembers notebook details revealed by a tool
    /// payload. Advisory only; the loop never depends on it. Payloads may
    /// arrive wrapped in the MCP envelope with the structured fields under
    /// `structuredContent`.
    pub fn absorb_snapshot(&mut self, payload: &Value) {
        let details = payload
            .get("structuredContent")
            .filter(|inner| inner.is_object())
            .unwrap_or(payload);

        let saved = details.get("saved").and_then(Value::as_bool).unwrap_or(false);
        let exported = details
            .get("exported")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if saved || exported {
            if details.get("filepath").and_then(Value::as_str).is_some() {
                self.notebook_snapshot = Some(details.clone());
                return;
            }
        }

        if details.get("notebooks").and_then(Value::as_array).is_some() {
            self.notebook_snapshot = Some(details.clone());
        }
    }

    /// Best-known reference to the produced notebook: the last saved or
    /// exported filepath, else the last entry of the last listing seen.
    pub fn notebook_reference(&self) -> Option<String> {
        let snapshot = self.notebook_snapshot.as_ref()?;
        if let Some(filepath) = snapshot.get("filepath").and_then(Value::as_str) {
            return Some(filepath.to_string());
        }
        snapshot
            .get("notebooks")
            .and_then(Value::as_array)
            .and_then(|notebooks| notebooks.last())
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

pub(crate) fn log_transition(from: Phase, to: Phase, state: &AgenticState) {
    debug!(
        ?from,
        ?to,
        attempts = state.attempts,
        outputs = state.outputs.len(),
        keep_refining = state.keep_refining,
        tools = state.available_tools.len(),
        "Phase transition"
    );
}
