use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid agent configuration: {0}")]
    Configuration(String),
    #[error("task run cancelled before completion")]
    Cancelled,
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Configuration(reason) => {
                format!("The task was rejected before it started: {reason}.")
            }
            AgentError::Cancelled => {
                "The task run was cancelled before it could finish.".to_string()
            }
        }
    }
}
