//! HTTP route handlers for the operator API.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tracing::info;

use nexus::core::event_log::LogEntry;
use nexus::core::params::SystemParameters;
use nexus::core::types::Goal;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/goals", get(get_goals))
        .route("/logs", get(get_logs))
        .route("/context", get(get_context))
        .route("/params", get(get_params).put(put_params))
        .route("/run", get(get_run))
        .route("/run/toggle", post(toggle_run))
        .route("/directive", post(post_directive))
}

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn bad_request(err: anyhow::Error) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: format!("{err:#}"),
        }),
    )
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/goals - every goal in the forest, in creation order.
async fn get_goals(State(state): State<AppState>) -> Json<Vec<Goal>> {
    Json(state.engine.snapshot().await.goals)
}

/// GET /api/logs - the audit log, oldest first.
async fn get_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.engine.snapshot().await.logs)
}

#[derive(Serialize)]
struct ContextResponse {
    context: String,
}

/// GET /api/context - the accumulated knowledge context.
async fn get_context(State(state): State<AppState>) -> Json<ContextResponse> {
    Json(ContextResponse {
        context: state.engine.snapshot().await.context,
    })
}

async fn get_params(State(state): State<AppState>) -> Json<SystemParameters> {
    Json(state.engine.params().await)
}

/// Fields of a `PUT /api/params` body. Omitted fields keep their current value.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct ParamsPatch {
    alpha: Option<f32>,
    beta: Option<u32>,
    gamma: Option<f32>,
    recursion_limit: Option<u32>,
}

impl ParamsPatch {
    fn apply(self, current: SystemParameters) -> SystemParameters {
        SystemParameters {
            alpha: self.alpha.unwrap_or(current.alpha),
            beta: self.beta.unwrap_or(current.beta),
            gamma: self.gamma.unwrap_or(current.gamma),
            recursion_limit: self.recursion_limit.unwrap_or(current.recursion_limit),
        }
    }
}

/// PUT /api/params - update the given parameters; applies from the next cycle.
async fn put_params(
    State(state): State<AppState>,
    Json(patch): Json<ParamsPatch>,
) -> Result<Json<SystemParameters>, ApiError> {
    let params = patch.apply(state.engine.params().await);
    state.engine.set_params(params).await.map_err(bad_request)?;
    info!(?params, "parameters updated");
    Ok(Json(params))
}

#[derive(Serialize)]
struct RunResponse {
    running: bool,
    cycle_in_flight: bool,
}

async fn get_run(State(state): State<AppState>) -> Json<RunResponse> {
    Json(RunResponse {
        running: state.engine.is_running().await,
        cycle_in_flight: state.engine.is_cycle_in_flight(),
    })
}

/// POST /api/run/toggle - flip the run flag.
async fn toggle_run(State(state): State<AppState>) -> Json<RunResponse> {
    let running = state.engine.toggle().await;
    info!(running, "run toggled");
    Json(RunResponse {
        running,
        cycle_in_flight: state.engine.is_cycle_in_flight(),
    })
}

#[derive(Deserialize)]
struct DirectiveRequest {
    text: String,
}

/// POST /api/directive - replace the forest with a new root goal.
async fn post_directive(
    State(state): State<AppState>,
    Json(request): Json<DirectiveRequest>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    let root = state
        .engine
        .submit_directive(&request.text)
        .await
        .map_err(bad_request)?;
    info!(goal_id = %root.id, "directive submitted");
    Ok((StatusCode::CREATED, Json(root)))
}
