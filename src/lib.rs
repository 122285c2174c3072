pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, tooling};
pub use cli::{Cli, RunMode};
pub use config::AppConfig;
pub use domain::types;
pub use infrastructure::{model, server};

use application::agent::{Agent, AgentOptions};
use application::tooling::HttpNotebookServer;
use infrastructure::model::OllamaClient;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing();
    dotenvy::dotenv().ok();
    info!("Starting nbpilot");
    debug!(mode = ?cli.mode, config = ?cli.config, model = ?cli.model, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path or defaults");
    }
    apply_cli_overrides(&cli, &mut config);

    let provider = OllamaClient::new(config.model_url.clone());
    let service = Arc::new(HttpNotebookServer::new(config.notebook_server_url.clone()));
    let agent = Arc::new(Agent::new(provider, service, &config));

    info!(mode = ?cli.mode, "Running in selected mode");
    match cli.mode {
        RunMode::Task => {
            let task = load_task(&cli)?;
            let cancel = CancellationToken::new();
            let guard = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received; cancelling the current run");
                    guard.cancel();
                }
            });

            let options = AgentOptions {
                model: cli.model.clone(),
                max_attempts: cli.max_attempts.unwrap_or(config.max_attempts),
                tool_filter: config.tool_filter.clone(),
                cancel,
            };
            info!("Executing task from CLI mode");
            let report = agent.run(task, options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        RunMode::Rest => {
            info!(addr = %cli.rest_addr, "Starting REST server");
            server::serve(agent, config.max_attempts, cli.rest_addr).await?;
        }
    }
    info!("nbpilot execution finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}

fn load_task(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if let Some(path) = &cli.task_file {
        info!(path = %path, "Loading task from file");
        let content = fs::read_to_string(path)?;
        return Ok(content.trim().to_string());
    }

    if !cli.task.is_empty() {
        info!("Using task provided through CLI arguments");
        return Ok(cli.task.join(" ").trim().to_string());
    }

    warn!("Task not provided via arguments or file");
    Err("task required via arguments or --task-file".into())
}

fn apply_cli_overrides(cli: &Cli, config: &mut AppConfig) {
    if let Some(url) = &cli.server_url {
        info!(url = url.as_str(), "Overriding notebook service endpoint from CLI");
        config.notebook_server_url = url.clone();
    }
    if let Some(url) = &cli.ollama_url {
        info!(url = url.as_str(), "Overriding model provider endpoint from CLI");
        config.model_url = url.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.max_attempts = max_attempts;
    }
}
