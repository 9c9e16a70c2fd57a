use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::error::ServerError;

use super::AppState;
use super::schemas::{ChatDispatchRequest, ChatIdentityResponse, ChatReceiptResponse, ChatSettingsRequest, MessageResponse};

/// `POST /chat/test` -- confirm a token/channel pair resolves to a valid
/// chat platform identity without saving anything.
#[utoipa::path(
    post,
    path = "/chat/test",
    tag = "Chat",
    summary = "Test chat credentials",
    request_body = ChatSettingsRequest,
    responses(
        (status = 200, description = "Token is valid", body = ChatIdentityResponse),
        (status = 502, description = "Chat platform rejected the token or is unreachable")
    )
)]
pub async fn test(
    State(state): State<AppState>,
    Json(body): Json<ChatSettingsRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let identity = state.chat.test(&body.token).await?;
    Ok(Json(ChatIdentityResponse {
        user_id: identity.user_id,
        team_id: identity.team_id,
    }))
}

/// `POST /chat/save` -- persist chat settings for subsequent incident
/// notifications.
#[utoipa::path(
    post,
    path = "/chat/save",
    tag = "Chat",
    summary = "Save chat settings",
    request_body = ChatSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = MessageResponse)
    )
)]
pub async fn save(State(state): State<AppState>, Json(body): Json<ChatSettingsRequest>) -> impl IntoResponse {
    {
        let mut guard = state.state.lock();
        guard.chat.token = body.token;
        guard.chat.channel = body.channel;
        guard.chat.workspace = body.workspace;
    }
    Json(MessageResponse { message: "chat settings saved".to_string() })
}

/// `POST /chat/dispatch` -- send the last generated report's text to chat
/// on demand, optionally overriding the saved channel for this call only.
#[utoipa::path(
    post,
    path = "/chat/dispatch",
    tag = "Chat",
    summary = "Dispatch a chat message",
    request_body = ChatDispatchRequest,
    responses(
        (status = 200, description = "Message delivered", body = ChatReceiptResponse),
        (status = 400, description = "Chat is not configured or nothing to send"),
        (status = 502, description = "Chat platform rejected the message")
    )
)]
pub async fn dispatch(
    State(state): State<AppState>,
    Json(body): Json<ChatDispatchRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let (token, channel, text) = {
        let guard = state.state.lock();
        if !guard.chat.is_configured() {
            return Err(incident_core::CoreError::not_configured("chat is not configured").into());
        }
        let report = guard
            .last_report
            .as_ref()
            .ok_or_else(|| incident_core::CoreError::bad_request("no report available to dispatch"))?;
        let channel = body.channel.unwrap_or_else(|| guard.chat.channel.clone());
        let text = format!("*{}*\n```\n{}\n```", report.title, report.report_body);
        (guard.chat.token.clone(), channel, text)
    };

    let receipt = state.chat.post(&token, &channel, &text).await?;
    Ok(Json(ChatReceiptResponse {
        channel: receipt.channel,
        ts: receipt.ts,
    }))
}
