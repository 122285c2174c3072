use super::super::dto::{ConfigFileResponse, ConfigUpdateRequest, ErrorResponse};
use super::super::state::ServerState;
use crate::config::{AppConfig, CONFIG_PATH, ConfigError};
use crate::model::ModelProvider;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    get,
    path = "/config-file",
    tag = "config",
    responses(
        (status = 200, description = "Current client configuration", body = ConfigFileResponse),
        (status = 500, description = "Failed to load configuration", body = ErrorResponse)
    )
)]
pub async fn config_get_handler<P: ModelProvider>(
    State(_state): State<Arc<ServerState<P>>>,
) -> Result<Json<ConfigFileResponse>, (StatusCode, Json<ErrorResponse>)> {
    let path = Path::new(CONFIG_PATH);
    let config = match AppConfig::load(Some(path)) {
        Ok(config) => config,
        Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            AppConfig::default()
        }
        Err(error) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to load config: {error}"),
                }),
            ));
        }
    };

    let raw = std::fs::read_to_string(path).unwrap_or_else(|_| render_config_raw(&config));

    Ok(Json(ConfigFileResponse {
        model: config.model,
        notebook_server_url: config.notebook_server_url,
        system_prompt: config.system_prompt,
        max_attempts: config.max_attempts,
        raw,
    }))
}

#[utoipa::path(
    put,
    path = "/config-file",
    tag = "config",
    request_body = ConfigUpdateRequest,
    responses(
        (status = 200, description = "Configuration updated", body = ConfigFileResponse),
        (status = 400, description = "Invalid configuration", body = ErrorResponse),
        (status = 500, description = "Failed to persist configuration", body = ErrorResponse)
    )
)]
pub async fn config_put_handler<P: ModelProvider>(
    State(_state): State<Arc<ServerState<P>>>,
    Json(payload): Json<ConfigUpdateRequest>,
) -> Result<Json<ConfigFileResponse>, (StatusCode, Json<ErrorResponse>)> {
    if payload.max_attempts == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "max_attempts must be greater than zero".to_string(),
            }),
        ));
    }

    let path = Path::new(CONFIG_PATH);
    let mut config = AppConfig::load(Some(path)).unwrap_or_else(|_| AppConfig::default());
    config.model = payload.model;
    config.notebook_server_url = payload.notebook_server_url;
    config.system_prompt = payload.system_prompt;
    config.max_attempts = payload.max_attempts;

    if let Some(parent) = path.parent() {
        if let Err(error) = std::fs::create_dir_all(parent) {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to prepare config directory: {error}"),
                }),
            ));
        }
    }

    let raw = render_config_raw(&config);
    if let Err(error) = std::fs::write(path, &raw) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("failed to write config: {error}"),
            }),
        ));
    }

    info!(path = %path.display(), "Configuration updated via REST");

    Ok(Json(ConfigFileResponse {
        model: config.model,
        notebook_server_url: config.notebook_server_url,
        system_prompt: config.system_prompt,
        max_attempts: config.max_attempts,
        raw,
    }))
}

fn render_config_raw(config: &AppConfig) -> String {
    let mut raw = format!("model = \"{}\"\n", config.model.replace('"', "\\\""));
    raw.push_str(&format!(
        "notebook_server_url = \"{}\"\n",
        config.notebook_server_url.replace('"', "\\\"")
    ));
    raw.push_str(&format!("max_attempts = {}\n", config.max_attempts));
    if let Some(system_prompt) = &config.system_prompt {
        raw.push_str(&format!(
            "system_prompt = \"{}\"\n",
            system_prompt.replace('"', "\\\"")
        ));
    }
    if let Some(filter) = &config.tool_filter {
        raw.push_str("tool_filter = [\n");
        for name in filter {
            raw.push_str(&format!("    \"{}\",\n", name.replace('"', "\\\"")));
        }
        raw.push_str("]\n");
    }
    raw
}
