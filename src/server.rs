use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::evaluation::{
    validate_input, EvaluationEngine, EvaluationInput, EvaluationResult, ValidationReport,
};
use crate::rubric::RubricModel;

#[derive(Clone)]
pub struct ApiState {
    config: Config,
    engine: EvaluationEngine,
    fingerprint: Arc<str>,
}

impl ApiState {
    pub fn new(config: Config, rubric: Arc<RubricModel>) -> Self {
        let fingerprint = Arc::from(rubric.fingerprint());
        Self {
            config,
            engine: EvaluationEngine::new(rubric),
            fingerprint,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejecting request body");
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelResponse<'a> {
    version: &'a str,
    fingerprint: &'a str,
    rubric: &'a RubricModel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculateResponse {
    #[serde(flatten)]
    result: EvaluationResult,
    rubric_version: String,
    fingerprint: String,
    evaluated_at: DateTime<Utc>,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/evaluation/model", get(model))
        .route("/v1/evaluation/calculate", post(calculate))
        .route("/v1/evaluation/validate", post(validate))
        .route("/v1/config", get(show_config))
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(config: Config, bind: SocketAddr, rubric: Arc<RubricModel>) -> Result<()> {
    let version = rubric.version.clone();
    let app = router(ApiState::new(config, rubric));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(rubric_version = %version, "REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn model(State(state): State<ApiState>) -> Response {
    let rubric = state.engine.rubric();
    ok(ModelResponse {
        version: &rubric.version,
        fingerprint: &state.fingerprint,
        rubric,
    })
    .into_response()
}

async fn validate(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<EvaluationInput>, JsonRejection>,
) -> ApiResult<ValidationReport> {
    let Json(input) = payload.map_err(ApiError::from)?;
    Ok(ok(validate_input(&input, state.engine.rubric())))
}

async fn calculate(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<EvaluationInput>, JsonRejection>,
) -> ApiResult<CalculateResponse> {
    let Json(input) = payload.map_err(ApiError::from)?;
    let report = validate_input(&input, state.engine.rubric());
    if !report.is_valid {
        let message = report.error_messages().join("; ");
        warn!(company = %input.company.name, %message, "rejecting evaluation input");
        return Err(ApiError::bad_request(message));
    }

    let result = state.engine.evaluate(&input);
    Ok(ok(CalculateResponse {
        result,
        rubric_version: state.engine.rubric().version.clone(),
        fingerprint: state.fingerprint.to_string(),
        evaluated_at: Utc::now(),
    }))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}
