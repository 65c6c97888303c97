use axum::{extract::State, http::StatusCode, Extension, Json};
use mentionbot_monitor::RunMetrics;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct TriggerData {
    kind: &'static str,
    status: &'static str,
}

pub(super) async fn get_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<RunMetrics>> {
    Json(ApiResponse {
        data: state.runner.service().metrics_snapshot().await,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn trigger_full_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerData>>), ApiError> {
    if state.runner.try_start_full("api").is_none() {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "a monitoring run is already in progress",
        ));
    }
    Ok(accepted("full", req_id))
}

pub(super) async fn trigger_urgent_check(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerData>>), ApiError> {
    if state.runner.try_start_urgent("api").is_none() {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "an urgent check is already in progress",
        ));
    }
    Ok(accepted("urgent", req_id))
}

fn accepted(kind: &'static str, req_id: RequestId) -> (StatusCode, Json<ApiResponse<TriggerData>>) {
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggerData {
                kind,
                status: "started",
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}
