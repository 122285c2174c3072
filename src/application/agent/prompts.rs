use super::state::Phase;
use crate::application::tooling::ToolDescriptor;
use crate::config::PromptConfig;

const DEFAULT_ENTRY_TEMPLATE: &str = r#"You are planning work for an autonomous notebook-building assistant.
Rewrite the task below into a concrete, executable goal that uses the available notebook tools and follows the stateful notebook workflow: create cells, execute them, then save the notebook.
Reply with the refined task description only.

CURRENT TASK: {{task}}

Previous outputs:
{{outputs}}

Available notebook tools:
{{tools}}"#;

const DEFAULT_ATTEMPT_TEMPLATE: &str = r#"You are an autonomous notebook-building assistant working on attempt {{attempt}}.
Reply with JSON only, without commentary or code fences, in the form:
{"action":"invoke","calls":[{"tool":"toolName","arguments":{}}]}
Be systematic and check that each step runs properly. Remember to persist your work with a save tool when the notebook is complete.

CURRENT TASK: {{task}}

Previous outputs:
{{outputs}}

Available notebook tools:
{{tools}}"#;

const DEFAULT_REFINE_TEMPLATE: &str = r#"You are reviewing progress after attempt {{attempt}} of a notebook-building task.
Do you need to keep refining the notebook to accomplish the task: {{task}}
Consider whether more content or executions are needed, or whether the notebook is complete and saved.
Answer yes or no. ONLY YES OR NO!

Previous outputs:
{{outputs}}"#;

/// Builds the phase prompts. Pure: identical inputs always produce
/// byte-identical output, which the test fixtures rely on.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    entry_template: String,
    attempt_template: String,
    refine_template: String,
    output_budget: usize,
}

impl PromptAssembler {
    pub fn new(prompts: &PromptConfig, output_budget: usize) -> Self {
        Self {
            entry_template: prompts
                .entry
                .clone()
                .unwrap_or_else(|| DEFAULT_ENTRY_TEMPLATE.to_string()),
            attempt_template: prompts
                .attempt
                .clone()
                .unwrap_or_else(|| DEFAULT_ATTEMPT_TEMPLATE.to_string()),
            refine_template: prompts
                .refine
                .clone()
                .unwrap_or_else(|| DEFAULT_REFINE_TEMPLATE.to_string()),
            output_budget,
        }
    }

    pub fn build(
        &self,
        phase: Phase,
        task: &str,
        outputs: &[String],
        tools: &[ToolDescriptor],
        attempts: usize,
    ) -> String {
        let template = match phase {
            Phase::Entry => &self.entry_template,
            Phase::CodeAttempt => &self.attempt_template,
            Phase::Refining => &self.refine_template,
            // Pure and terminal phases have no prompt.
            Phase::Routing | Phase::Finished => return String::new(),
        };

        template
            .replace("{{task}}", task)
            .replace("{{outputs}}", &self.outputs_section(outputs))
            .replace("{{tools}}", &tools_section(tools))
            .replace("{{attempt}}", &(attempts + 1).to_string())
    }

    /// Renders the run log within the character budget. Older entries are
    /// elided first: the most recent outcomes matter most for the next
    /// decision.
    fn outputs_section(&self, outputs: &[String]) -> String {
        if outputs.is_empty() {
            return "(none yet)".to_string();
        }

        let mut kept: Vec<&String> = Vec::new();
        let mut used = 0usize;
        for entry in outputs.iter().rev() {
            let cost = entry.chars().count() + 1;
            if !kept.is_empty() && used + cost > self.output_budget {
                break;
            }
            kept.push(entry);
            used += cost;
        }
        kept.reverse();

        let elided = outputs.len() - kept.len();
        let mut section = String::new();
        if elided > 0 {
            section.push_str(&format!("[{elided} earlier entries elided]\n"));
        }

        if kept.len() == 1 && kept[0].chars().count() > self.output_budget {
            let truncated: String = kept[0].chars().take(self.output_budget).collect();
            section.push_str(&truncated);
            section.push_str("...");
        } else {
            section.push_str(
                &kept
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        section
    }
}

fn tools_section(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "(no tools available)".to_string();
    }

    let mut lines = Vec::with_capacity(tools.len());
    for descriptor in tools {
        let mut line = format!("- {}", descriptor.name);
        if let Some(description) = &descriptor.description {
            line.push_str(&format!(": {description}"));
        }
        if let Some(schema) = &descriptor.input_schema {
            let compact = serde_json::to_string(schema).unwrap_or_default();
            line.push_str(&format!(". Input schema: {compact}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}
