use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use super::AppState;
use super::schemas::{AiSettingsRequest, MessageResponse};

/// `POST /ai/save` -- persist the LLM API key used for report generation.
#[utoipa::path(
    post,
    path = "/ai/save",
    tag = "AI",
    summary = "Save AI settings",
    request_body = AiSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = MessageResponse)
    )
)]
pub async fn save(State(state): State<AppState>, Json(body): Json<AiSettingsRequest>) -> impl IntoResponse {
    state.state.lock().ai.api_key = body.api_key;
    Json(MessageResponse { message: "AI settings saved".to_string() })
}
