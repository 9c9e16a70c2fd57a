use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::error::ServerError;

use super::AppState;
use super::schemas::ActionExecutionResponse;

/// `POST /actions/{id}/execute` -- dispatch a pending action plan to the
/// simulator. Idempotent on an already-executed plan.
#[utoipa::path(
    post,
    path = "/actions/{id}/execute",
    tag = "Actions",
    summary = "Execute a pending action plan",
    params(("id" = Uuid, Path, description = "Action execution id")),
    responses(
        (status = 200, description = "Action plan executed", body = ActionExecutionResponse),
        (status = 400, description = "Unknown execution id or simulator rejected an action")
    )
)]
pub async fn execute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let execution = incident_actions::execute_pending(&state.state, &state.knowledge, &state.simulator, id).await?;
    notify(&state, &execution).await;
    Ok(Json(ActionExecutionResponse { execution }))
}

/// `POST /actions/{id}/defer` -- defer a pending action plan. Idempotent on
/// an already-executed plan.
#[utoipa::path(
    post,
    path = "/actions/{id}/defer",
    tag = "Actions",
    summary = "Defer a pending action plan",
    params(("id" = Uuid, Path, description = "Action execution id")),
    responses(
        (status = 200, description = "Action plan deferred", body = ActionExecutionResponse),
        (status = 400, description = "Unknown execution id")
    )
)]
pub async fn defer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let execution = incident_actions::defer_execution(&state.state, &state.knowledge, id).await?;
    notify(&state, &execution).await;
    Ok(Json(ActionExecutionResponse { execution }))
}

/// Best-effort email notification of the status transition, fanned out to
/// the registered recipient registry. A missing sink (no SMTP host
/// configured) is a silent no-op, matching the sink's own contract.
async fn notify(state: &AppState, execution: &incident_core::ActionExecution) {
    let Some(notify) = &state.notify else {
        return;
    };
    let recipients = state.state.lock().email_recipients.clone();
    notify.notify_status_change(&recipients, execution).await;
}
