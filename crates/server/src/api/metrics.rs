use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::error::ServerError;

use super::AppState;
use super::schemas::{MessageResponse, MetricsTestRequest, MetricsTestResponse};

/// `POST /metrics/test` -- fetch one sample from each query against the
/// given endpoint, without saving anything.
#[utoipa::path(
    post,
    path = "/metrics/test",
    tag = "Metrics",
    summary = "Test metrics endpoint",
    request_body = MetricsTestRequest,
    responses(
        (status = 200, description = "Samples fetched", body = MetricsTestResponse),
        (status = 502, description = "Metrics source unreachable or query failed")
    )
)]
pub async fn test(
    State(state): State<AppState>,
    Json(body): Json<MetricsTestRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let http = state.metrics.instant_value(&body.url, &body.http_query).await?;
    let cpu = state.metrics.instant_value(&body.url, &body.cpu_query).await?;
    Ok(Json(MetricsTestResponse { http, cpu }))
}

/// `POST /metrics/save` -- persist the metrics source the Sampling Monitor
/// polls.
#[utoipa::path(
    post,
    path = "/metrics/save",
    tag = "Metrics",
    summary = "Save metrics settings",
    request_body = incident_core::MetricsSettings,
    responses(
        (status = 200, description = "Settings saved", body = MessageResponse)
    )
)]
pub async fn save(
    State(state): State<AppState>,
    Json(body): Json<incident_core::MetricsSettings>,
) -> impl IntoResponse {
    state.state.lock().metrics = body;
    Json(MessageResponse { message: "metrics settings saved".to_string() })
}
