use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "llama3";
const DEFAULT_MODEL_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_NOTEBOOK_SERVER_URL: &str = "http://127.0.0.1:9400/rpc";
const DEFAULT_MAX_ATTEMPTS: usize = 5;
const DEFAULT_OUTPUT_BUDGET: usize = 4000;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONFIG_PATH: &str = "config/client.toml";
pub const CONFIG_PATH: &str = DEFAULT_CONFIG_PATH;

fn default_continue_tokens() -> Vec<String> {
    ["yes", "continue", "keep refining", "more work"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_stop_tokens() -> Vec<String> {
    ["no", "done", "finished", "complete", "stop"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub model_url: String,
    pub notebook_server_url: String,
    pub system_prompt: Option<String>,
    pub max_attempts: usize,
    pub output_budget: usize,
    pub model_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub tool_filter: Option<Vec<String>>,
    pub prompts: PromptConfig,
    pub decision: DecisionConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptConfig {
    pub entry: Option<String>,
    pub attempt: Option<String>,
    pub refine: Option<String>,
}

/// Token lists for the refine-decision parser. The lists are deliberately
/// configuration rather than code: the accepted phrasings are fuzzy and
/// expected to be tuned against real model output.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionConfig {
    #[serde(default = "default_continue_tokens")]
    pub continue_tokens: Vec<String>,
    #[serde(default = "default_stop_tokens")]
    pub stop_tokens: Vec<String>,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            continue_tokens: default_continue_tokens(),
            stop_tokens: default_stop_tokens(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    model: Option<String>,
    model_url: Option<String>,
    notebook_server_url: Option<String>,
    system_prompt: Option<String>,
    max_attempts: Option<usize>,
    output_budget: Option<usize>,
    model_timeout_secs: Option<u64>,
    tool_timeout_secs: Option<u64>,
    tool_filter: Option<Vec<String>>,
    #[serde(default)]
    prompts: PromptConfig,
    #[serde(default)]
    decision: DecisionConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }

    pub fn default() -> Self {
        RawConfig::default().into()
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading client configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parsed.into())
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            model: raw.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            model_url: raw.model_url.unwrap_or_else(|| DEFAULT_MODEL_URL.to_string()),
            notebook_server_url: raw
                .notebook_server_url
                .unwrap_or_else(|| DEFAULT_NOTEBOOK_SERVER_URL.to_string()),
            system_prompt: raw.system_prompt,
            max_attempts: raw.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            output_budget: raw.output_budget.unwrap_or(DEFAULT_OUTPUT_BUDGET),
            model_timeout_secs: raw.model_timeout_secs.unwrap_or(DEFAULT_MODEL_TIMEOUT_SECS),
            tool_timeout_secs: raw.tool_timeout_secs.unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
            tool_filter: raw.tool_filter,
            prompts: raw.prompts,
            decision: raw.decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static WORKDIR_GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn returns_default_when_missing() {
        let _lock = WORKDIR_GUARD.lock().expect("lock guard");
        let original_dir = env::current_dir().expect("current dir");
        let temp = tempfile::tempdir().expect("tempdir");
        env::set_current_dir(temp.path()).expect("switch to temp dir");

        let config = AppConfig::load(None).expect("load succeeds");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.notebook_server_url, DEFAULT_NOTEBOOK_SERVER_URL);
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(config.system_prompt.is_none());
        assert!(config.tool_filter.is_none());
        assert!(config.decision.stop_tokens.contains(&"done".to_string()));

        env::set_current_dir(original_dir).expect("restore current dir");
    }

    #[test]
    fn reads_core_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client.toml");
        fs::write(
            &path,
            r#"
model = "mistral"
notebook_server_url = "http://notebooks.internal:9400/rpc"
max_attempts = 3
system_prompt = "keep short"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.model, "mistral");
        assert_eq!(
            config.notebook_server_url,
            "http://notebooks.internal:9400/rpc"
        );
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.system_prompt.as_deref(), Some("keep short"));
        assert_eq!(config.model_timeout_secs, DEFAULT_MODEL_TIMEOUT_SECS);
    }

    #[test]
    fn reads_decision_tokens_and_filter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client.toml");
        fs::write(
            &path,
            r#"
tool_filter = ["createMarkdownCell", "saveNotebook"]

[decision]
continue_tokens = ["yes", "again"]
stop_tokens = ["halt"]
"#,
        )
        .expect("write config");

        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(
            config.tool_filter.as_deref(),
            Some(&["createMarkdownCell".to_string(), "saveNotebook".to_string()][..])
        );
        assert_eq!(config.decision.continue_tokens, vec!["yes", "again"]);
        assert_eq!(config.decision.stop_tokens, vec!["halt"]);
    }

    #[test]
    fn reads_prompt_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client.toml");
        fs::write(
            &path,
            r#"
[prompts]
refine = "Is the notebook finished for: {{task}}?"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(Some(&path)).expect("load");
        assert!(config.prompts.entry.is_none());
        assert_eq!(
            config.prompts.refine.as_deref(),
            Some("Is the notebook finished for: {{task}}?")
        );
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client.toml");
        fs::write(&path, "model = [unclosed").expect("write");

        let err = AppConfig::load(Some(&path)).expect_err("parse fails");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
