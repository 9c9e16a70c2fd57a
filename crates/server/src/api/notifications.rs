use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::error::ServerError;

use super::AppState;
use super::schemas::{
    AcknowledgeResponse, AddEmailRequest, EmailListResponse, NotificationPreferencesRequest,
    RecipientResponse, RemovedResponse,
};

/// `POST /notifications/preferences` -- toggle which notification sinks
/// the incident pipeline delivers through.
#[utoipa::path(
    post,
    path = "/notifications/preferences",
    tag = "Notifications",
    summary = "Update notification preferences",
    request_body = NotificationPreferencesRequest,
    responses(
        (status = 200, description = "Updated preferences", body = incident_core::NotificationPreferences)
    )
)]
pub async fn update_preferences(
    State(state): State<AppState>,
    Json(body): Json<NotificationPreferencesRequest>,
) -> impl IntoResponse {
    let mut guard = state.state.lock();
    guard.preferences.chat_enabled = body.chat;
    Json(guard.preferences.clone())
}

/// `GET /notifications/emails` -- list registered email recipients.
#[utoipa::path(
    get,
    path = "/notifications/emails",
    tag = "Notifications",
    summary = "List email recipients",
    responses(
        (status = 200, description = "Registered recipients", body = EmailListResponse)
    )
)]
pub async fn list_emails(State(state): State<AppState>) -> impl IntoResponse {
    let emails = state.state.lock().email_recipients.clone();
    Json(EmailListResponse { emails })
}

/// `POST /notifications/emails` -- register a new email recipient.
///
/// Idempotent on the normalized (trimmed, lower-cased) email address: a
/// second add for an email already in the registry returns the existing
/// entry rather than creating a duplicate, preserving the registry's
/// one-entry-per-email invariant.
#[utoipa::path(
    post,
    path = "/notifications/emails",
    tag = "Notifications",
    summary = "Add an email recipient",
    request_body = AddEmailRequest,
    responses(
        (status = 200, description = "Recipient registered", body = RecipientResponse)
    )
)]
pub async fn add_email(State(state): State<AppState>, Json(body): Json<AddEmailRequest>) -> impl IntoResponse {
    let normalized = incident_core::normalize_email(&body.email);
    let mut guard = state.state.lock();
    if let Some(existing) = guard.email_recipients.iter().find(|r| r.email == normalized) {
        return Json(RecipientResponse { recipient: existing.clone() });
    }
    let recipient = incident_core::EmailRecipient::new(&body.email);
    guard.email_recipients.push(recipient.clone());
    Json(RecipientResponse { recipient })
}

/// `DELETE /notifications/emails/{id}` -- remove a registered recipient.
#[utoipa::path(
    delete,
    path = "/notifications/emails/{id}",
    tag = "Notifications",
    summary = "Remove an email recipient",
    params(("id" = Uuid, Path, description = "Recipient id")),
    responses(
        (status = 200, description = "Recipient removed", body = RemovedResponse),
        (status = 404, description = "No such recipient")
    )
)]
pub async fn remove_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let mut guard = state.state.lock();
    let before = guard.email_recipients.len();
    guard.email_recipients.retain(|r| r.id != id);
    if guard.email_recipients.len() == before {
        return Err(ServerError::NotFound(format!("email recipient {id}")));
    }
    Ok(Json(RemovedResponse { removed: id }))
}

/// `POST /notifications/pending/{id}/ack` -- acknowledge a pending report,
/// dropping it from the pending queue. `recipients_missing` on the report
/// itself is left as-is; acknowledgement records that a human has seen the
/// gap, not that it has been filled.
#[utoipa::path(
    post,
    path = "/notifications/pending/{id}/ack",
    tag = "Notifications",
    summary = "Acknowledge a pending report",
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report acknowledged", body = AcknowledgeResponse),
        (status = 404, description = "No such pending report")
    )
)]
pub async fn acknowledge_pending(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
    let mut guard = state.state.lock();
    let before = guard.pending_reports.len();
    guard.pending_reports.retain(|r| r.id != id);
    if guard.pending_reports.len() == before {
        return Err(ServerError::NotFound(format!("pending report {id}")));
    }
    Ok(Json(AcknowledgeResponse {
        status: "acknowledged",
        report_id: id,
    }))
}
