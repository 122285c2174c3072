//! Phase parsers for free-text model output. Each parser is total: any
//! input maps to a value, with conservative defaults for unusable text
//! (no tool calls; stop refining).

use super::models::ToolCallRequest;
use serde_json::{Value, json};

/// Extracts tool-call requests from a model reply. Accepted shapes:
/// `{"action":"invoke","calls":[...]}`, `{"calls":[...]}`,
/// `{"tool_calls":[...]}`, a bare call object `{"tool":...,"arguments":...}`,
/// or an array of call objects. Call objects may use `tool`/`name` and
/// `arguments`/`args`/`input`. Code fences and surrounding prose are
/// tolerated. Anything else yields an empty list.
pub fn parse_tool_calls(content: &str) -> Vec<ToolCallRequest> {
    match extract_json(content) {
        Some(value) => calls_from_value(&value),
        None => Vec::new(),
    }
}

fn calls_from_value(value: &Value) -> Vec<ToolCallRequest> {
    match value {
        Value::Array(items) => items.iter().filter_map(call_from_value).collect(),
        Value::Object(map) => {
            for key in ["calls", "tool_calls"] {
                if let Some(Value::Array(items)) = map.get(key) {
                    return items.iter().filter_map(call_from_value).collect();
                }
            }
            call_from_value(value).into_iter().collect()
        }
        Value::String(text) => parse_tool_calls(text),
        _ => Vec::new(),
    }
}

fn call_from_value(value: &Value) -> Option<ToolCallRequest> {
    let map = value.as_object()?;
    let tool = map
        .get("tool")
        .or_else(|| map.get("name"))
        .and_then(Value::as_str)?;
    if tool.trim().is_empty() {
        return None;
    }
    let arguments = map
        .get("arguments")
        .or_else(|| map.get("args"))
        .or_else(|| map.get("input"))
        .cloned()
        .unwrap_or_else(|| json!({}));
    Some(ToolCallRequest {
        tool: tool.to_string(),
        arguments,
    })
}

fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if trimmed.starts_with("```") {
        let stripped = trimmed.trim_start_matches("```json");
        let stripped = stripped.trim_start_matches("```JSON");
        let stripped = stripped.trim_start_matches("```");
        if let Some(end) = stripped.rfind("```") {
            let slice = &stripped[..end];
            if let Ok(value) = serde_json::from_str::<Value>(slice.trim()) {
                return Some(value);
            }
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                let candidate = &trimmed[start..=end];
                if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                    return Some(value);
                }
            }
        }
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineSignal {
    pub keep_refining: bool,
    /// False when no configured token matched; the decision then defaults
    /// to stop and the controller records the inconclusive reply.
    pub parsed: bool,
}

/// Classifies a refine reply against configured token lists. Tokens match
/// on word boundaries after lowercasing, so "no" never fires inside
/// "notebook". Stop tokens win over continue tokens.
pub fn parse_refine_decision(
    content: &str,
    continue_tokens: &[String],
    stop_tokens: &[String],
) -> RefineSignal {
    let haystack = normalized(content);

    if stop_tokens.iter().any(|token| has_token(&haystack, token)) {
        return RefineSignal {
            keep_refining: false,
            parsed: true,
        };
    }
    if continue_tokens.iter().any(|token| has_token(&haystack, token)) {
        return RefineSignal {
            keep_refining: true,
            parsed: true,
        };
    }
    RefineSignal {
        keep_refining: false,
        parsed: false,
    }
}

fn normalized(text: &str) -> String {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(String::from)
        .collect();
    format!(" {} ", words.join(" "))
}

fn has_token(haystack: &str, token: &str) -> bool {
    let needle = normalized(token);
    if needle.trim().is_empty() {
        return false;
    }
    haystack.contains(needle.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn default_decision(content: &str) -> RefineSignal {
        parse_refine_decision(
            content,
            &tokens(&["yes", "continue", "keep refining", "more work"]),
            &tokens(&["no", "done", "finished", "complete", "stop"]),
        )
    }

    #[test]
    fn parses_invoke_action_with_calls() {
        let calls = parse_tool_calls(
            r##"{"action":"invoke","calls":[
                {"tool":"createMarkdownCell","arguments":{"content":"# Hello"}},
                {"tool":"saveNotebook","arguments":{"filename":"hello.ipynb"}}
            ]}"##,
        );
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].tool, "createMarkdownCell");
        assert_eq!(calls[1].arguments["filename"], "hello.ipynb");
    }

    #[test]
    fn parses_bare_call_object() {
        let calls = parse_tool_calls(r#"{"tool":"executeCodeCell","arguments":{"index":0}}"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "executeCodeCell");
        assert_eq!(calls[0].arguments["index"], 0);
    }

    #[test]
    fn parses_array_of_calls() {
        let calls = parse_tool_calls(
            r#"[{"name":"createCodeCell","args":{"content":"print(1)"}},
                {"name":"executeCodeCell","input":{"index":0}}]"#,
        );
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].tool, "createCodeCell");
        assert_eq!(calls[0].arguments["content"], "print(1)");
        assert_eq!(calls[1].arguments["index"], 0);
    }

    #[test]
    fn strips_code_fences() {
        let calls = parse_tool_calls(
            "```json\n{\"tool\":\"saveNotebook\",\"arguments\":{\"filename\":\"a.ipynb\"}}\n```",
        );
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "saveNotebook");
    }

    #[test]
    fn finds_object_inside_prose() {
        let calls = parse_tool_calls(
            "I will create the cell now: {\"tool\":\"createMarkdownCell\",\"arguments\":{\"content\":\"hi\"}} and then stop.",
        );
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "createMarkdownCell");
    }

    #[test]
    fn missing_arguments_default_to_empty_object() {
        let calls = parse_tool_calls(r#"{"tool":"listSavedNotebooks"}"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments, json!({}));
    }

    #[test]
    fn plain_prose_yields_no_calls() {
        assert!(parse_tool_calls("I cannot find a suitable tool for this.").is_empty());
    }

    #[test]
    fn json_without_tool_name_yields_no_calls() {
        assert!(parse_tool_calls(r#"{"action":"final","response":"done"}"#).is_empty());
        assert!(parse_tool_calls(r#"{"tool":"","arguments":{}}"#).is_empty());
        assert!(parse_tool_calls("[1, 2, 3]").is_empty());
    }

    #[test]
    fn affirmative_replies_continue() {
        assert_eq!(
            default_decision("Yes"),
            RefineSignal { keep_refining: true, parsed: true }
        );
        assert_eq!(
            default_decision("yes, the chart still needs labels"),
            RefineSignal { keep_refining: true, parsed: true }
        );
        assert_eq!(
            default_decision("We should keep refining the layout."),
            RefineSignal { keep_refining: true, parsed: true }
        );
    }

    #[test]
    fn negative_replies_stop() {
        assert_eq!(
            default_decision("No."),
            RefineSignal { keep_refining: false, parsed: true }
        );
        assert_eq!(
            default_decision("The task is DONE and saved."),
            RefineSignal { keep_refining: false, parsed: true }
        );
    }

    #[test]
    fn stop_tokens_win_over_continue_tokens() {
        assert_eq!(
            default_decision("yes, everything is done now"),
            RefineSignal { keep_refining: false, parsed: true }
        );
    }

    #[test]
    fn tokens_match_whole_words_only() {
        // "notebook" must not match the stop token "no".
        assert_eq!(
            default_decision("the notebook needs another pass, yes"),
            RefineSignal { keep_refining: true, parsed: true }
        );
    }

    #[test]
    fn unmatched_reply_defaults_to_stop_unparsed() {
        assert_eq!(
            default_decision("perhaps"),
            RefineSignal { keep_refining: false, parsed: false }
        );
        assert_eq!(
            default_decision(""),
            RefineSignal { keep_refining: false, parsed: false }
        );
    }

    #[test]
    fn multiword_tokens_match_across_punctuation() {
        assert_eq!(
            default_decision("Keep refining! The table is empty."),
            RefineSignal { keep_refining: true, parsed: true }
        );
    }
}
