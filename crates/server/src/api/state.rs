use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use incident_core::StateSnapshot;

use super::AppState;

/// `GET /state` -- a full, point-in-time snapshot of console state.
#[utoipa::path(
    get,
    path = "/state",
    tag = "State",
    summary = "State snapshot",
    responses(
        (status = 200, description = "Current console state", body = StateSnapshot)
    )
)]
pub async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.state.snapshot())
}
