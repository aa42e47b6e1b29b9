mod cli;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::core::{
    Account, Assumptions, DEFAULT_LIFE_EXPECTANCY, GoalSolveConfig, GoalSolveResult,
    ProjectionError, ProjectionOptions, RetirementResult, run_projection, solve_goal,
};

pub use cli::{Cli, Command, LogFormat, ProjectArgs, ServeArgs, init_tracing, run_project_command};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub default_life_expectancy: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            default_life_expectancy: DEFAULT_LIFE_EXPECTANCY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AppState {
    default_life_expectancy: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OptionsPayload {
    start_year: Option<i32>,
    life_expectancy: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    assumptions: Option<Assumptions>,
    accounts: Vec<Account>,
    options: OptionsPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolvePayload {
    #[serde(default)]
    assumptions: Option<Assumptions>,
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default)]
    options: OptionsPayload,
    goal: GoalSolveConfig,
}

/// Inputs for one engine invocation, with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRequest {
    pub assumptions: Option<Assumptions>,
    pub accounts: Vec<Account>,
    pub options: ProjectionOptions,
}

impl ProjectionRequest {
    pub fn run(&self) -> Result<RetirementResult, ProjectionError> {
        run_projection(self.assumptions.as_ref(), &self.accounts, &self.options)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidPayload(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self, "rejected projection request");
        error_response(StatusCode::BAD_REQUEST, &self.to_string())
    }
}

pub fn app_router(config: &ServerConfig) -> Router {
    let state = Arc::new(AppState {
        default_life_expectancy: config.default_life_expectancy,
    });

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/projection", post(projection_handler))
        .route("/api/projection/solve", post(solve_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let app = app_router(&config);
    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "retirement projection API listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProjectionPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let request = projection_request_from_payload(payload, state.default_life_expectancy);
    let result = request.run()?;
    Ok(json_response(StatusCode::OK, result))
}

async fn solve_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SolvePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let options = resolve_options(&payload.options, state.default_life_expectancy);
    let result: GoalSolveResult = solve_goal(
        payload.assumptions.as_ref(),
        &payload.accounts,
        &options,
        payload.goal,
    )?;
    Ok(json_response(StatusCode::OK, result))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn resolve_options(payload: &OptionsPayload, default_life_expectancy: u32) -> ProjectionOptions {
    ProjectionOptions {
        start_year: payload.start_year.unwrap_or_else(current_year),
        life_expectancy: payload.life_expectancy.unwrap_or(default_life_expectancy),
    }
}

fn projection_request_from_payload(
    payload: ProjectionPayload,
    default_life_expectancy: u32,
) -> ProjectionRequest {
    let options = resolve_options(&payload.options, default_life_expectancy);
    ProjectionRequest {
        assumptions: payload.assumptions,
        accounts: payload.accounts,
        options,
    }
}

/// Parses a request body in the same shape the HTTP API accepts.
pub fn projection_request_from_json(
    json: &str,
    default_life_expectancy: u32,
) -> Result<ProjectionRequest, ApiError> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
    Ok(projection_request_from_payload(payload, default_life_expectancy))
}
