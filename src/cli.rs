use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(
    name = "nbpilot",
    version,
    about = "Autonomous notebook-building agent for MCP-style notebook tool servers"
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Notebook tool service JSON-RPC endpoint override
    #[arg(long)]
    pub server_url: Option<String>,

    /// Model provider base URL override
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Model name override
    #[arg(long)]
    pub model: Option<String>,

    /// Attempt cap override for this invocation
    #[arg(long)]
    pub max_attempts: Option<usize>,

    /// Read the task text from a file instead of the arguments
    #[arg(long)]
    pub task_file: Option<String>,

    #[arg(long, value_enum, default_value_t = RunMode::Task)]
    pub mode: RunMode,

    #[arg(long, default_value = "127.0.0.1:8080")]
    pub rest_addr: SocketAddr,

    /// Task text, joined from the remaining arguments
    pub task: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RunMode {
    /// Run a single task and print the JSON report
    Task,
    /// Serve the REST API
    Rest,
}
