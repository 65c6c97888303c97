use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SourceItem {
    name: &'static str,
    enabled: bool,
}

pub(super) async fn list_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<SourceItem>>> {
    let data = state
        .runner
        .service()
        .sources()
        .iter()
        .map(|source| SourceItem {
            name: source.name(),
            enabled: source.is_enabled(),
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}
