use axum::{extract::State, http::StatusCode, Extension, Json};
use kwdb_core::AutoCollectStatus;
use kwdb_db::TriggerSource;
use kwdb_research::RunRequest;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::runs::start_auto_run;

use super::{map_collect_error, ApiError, ApiResponse, AppState, MAX_SEED_CHARS};

const MAX_TARGET_COUNT: u32 = 10_000;
const MAX_INITIAL_SEEDS: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub(super) struct StartRequest {
    pub target_count: Option<u32>,
    #[serde(default)]
    pub seeds: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct StopData {
    stop_requested: bool,
    status: AutoCollectStatus,
}

pub(super) async fn get_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<AutoCollectStatus>> {
    Json(ApiResponse::new(
        state.collector.status().snapshot(),
        req_id.0,
    ))
}

pub(super) async fn start(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<StartRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AutoCollectStatus>>), ApiError> {
    let request = validate_start(&body, state.default_target)
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    let status = start_auto_run(&state, request, TriggerSource::Api)
        .map_err(|e| map_collect_error(req_id.0.clone(), &e))?;

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::new(status, req_id.0))))
}

pub(super) async fn stop(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StopData>>, ApiError> {
    let board = state.collector.status();
    if !board.request_stop() {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "no automatic collection run is in progress",
        ));
    }
    tracing::info!("auto-collect stop requested");

    Ok(Json(ApiResponse::new(
        StopData {
            stop_requested: true,
            status: board.snapshot(),
        },
        req_id.0,
    )))
}

fn validate_start(body: &StartRequest, default_target: u32) -> Result<RunRequest, String> {
    let target_count = body.target_count.unwrap_or(default_target);
    if target_count == 0 || target_count > MAX_TARGET_COUNT {
        return Err(format!(
            "target_count must be between 1 and {MAX_TARGET_COUNT}"
        ));
    }

    let initial_seeds: Vec<String> = body
        .seeds
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if initial_seeds.len() > MAX_INITIAL_SEEDS {
        return Err(format!("at most {MAX_INITIAL_SEEDS} seeds may be supplied"));
    }
    if initial_seeds
        .iter()
        .any(|s| s.chars().count() > MAX_SEED_CHARS)
    {
        return Err(format!("each seed must be 1 to {MAX_SEED_CHARS} characters"));
    }

    Ok(RunRequest {
        target_count,
        initial_seeds,
    })
}
