mod dto;
mod error;
mod routes;
mod state;

pub use error::ServerError;

use crate::agent::{Agent, TaskReport};
use crate::application::tooling::ToolDescriptor;
use crate::model::ModelProvider;
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use dto::{
    ConfigFileResponse, ConfigUpdateRequest, ErrorResponse, HealthResponse, InvokeToolRequest,
    InvokeToolResponse, TaskRequest, ToolInventoryResponse,
};
use routes::config::{config_get_handler, config_put_handler};
use routes::health::health_handler;
use routes::tasks::submit_task_handler;
use routes::tools::{invoke_tool_handler, tools_handler};
use state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::tasks::submit_task_handler,
        routes::tools::tools_handler,
        routes::tools::invoke_tool_handler,
        routes::health::health_handler,
        routes::config::config_get_handler,
        routes::config::config_put_handler
    ),
    components(
        schemas(
            TaskRequest,
            TaskReport,
            ErrorResponse,
            ToolInventoryResponse,
            ToolDescriptor,
            InvokeToolRequest,
            InvokeToolResponse,
            HealthResponse,
            ConfigFileResponse,
            ConfigUpdateRequest
        )
    ),
    tags(
        (name = "tasks", description = "Submit notebook-building tasks to the agent"),
        (name = "tools", description = "Inspect and invoke notebook tools"),
        (name = "health", description = "Service health"),
        (name = "config", description = "Client configuration management")
    )
)]
struct ApiDoc;

pub async fn serve<P>(
    agent: Arc<Agent<P>>,
    default_max_attempts: usize,
    addr: SocketAddr,
) -> Result<(), ServerError>
where
    P: ModelProvider + 'static,
{
    let api = ApiDoc::openapi();
    info!(%addr, "Binding REST server");

    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://127.0.0.1:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    let state = Arc::new(ServerState::new(agent, default_max_attempts));
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", api))
        .route("/tasks", post(submit_task_handler::<P>))
        .route("/tools", get(tools_handler::<P>))
        .route("/tools/call", post(invoke_tool_handler::<P>))
        .route("/health", get(health_handler::<P>))
        .route(
            "/config-file",
            get(config_get_handler::<P>).put(config_put_handler::<P>),
        )
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "REST server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}
