//! Live race endpoints
//!
//! Clients poll `status` on an interval; every poll refetches the timing
//! feed and rescores. `team` and `debug` read the cached snapshot only.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::scoring::RaceSnapshot;
use crate::session::{DebugReport, TeamDetail};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub live_results_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub message: String,
    pub race_data: RaceSnapshot,
}

/// Status response; snapshot fields are inlined when tracking
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub tracking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(flatten)]
    pub snapshot: Option<RaceSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub message: String,
    pub was_tracking: bool,
}

/// POST /api/live-race/:draft_id/start
pub async fn start_race(
    State(state): State<AppState>,
    Path(draft_id): Path<i64>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<StartResponse>> {
    let url = request
        .live_results_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Live results URL is required".to_string()))?;

    let race_data = state.registry.start(draft_id, &url).await?;

    Ok(Json(StartResponse {
        message: "Live race tracking started".to_string(),
        race_data,
    }))
}

/// GET /api/live-race/:draft_id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(draft_id): Path<i64>,
) -> ApiResult<Json<StatusResponse>> {
    let response = match state.registry.status(draft_id).await? {
        Some(snapshot) => StatusResponse {
            tracking: true,
            poll_interval_secs: Some(state.poll_interval_secs),
            snapshot: Some(snapshot),
        },
        None => StatusResponse {
            tracking: false,
            poll_interval_secs: None,
            snapshot: None,
        },
    };
    Ok(Json(response))
}

/// POST /api/live-race/:draft_id/stop
///
/// Idempotent: stopping an untracked draft still succeeds.
pub async fn stop_race(
    State(state): State<AppState>,
    Path(draft_id): Path<i64>,
) -> Json<StopResponse> {
    let was_tracking = state.registry.stop(draft_id).await;
    let message = if was_tracking {
        "Live race tracking stopped"
    } else {
        info!(draft_id, "Stop requested for untracked draft");
        "No active tracking for this draft"
    };

    Json(StopResponse {
        message: message.to_string(),
        was_tracking,
    })
}

/// GET /api/live-race/:draft_id/team/:team_id
pub async fn get_team(
    State(state): State<AppState>,
    Path((draft_id, team_id)): Path<(i64, i64)>,
) -> ApiResult<Json<TeamDetail>> {
    Ok(Json(state.registry.team(draft_id, team_id).await?))
}

/// GET /api/live-race/:draft_id/debug
pub async fn debug_race(
    State(state): State<AppState>,
    Path(draft_id): Path<i64>,
) -> ApiResult<Json<DebugReport>> {
    Ok(Json(state.registry.debug(draft_id).await?))
}
