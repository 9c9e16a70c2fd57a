use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;

use crate::error::ServerError;

use super::AppState;
use super::schemas::{AlertTriggerResponse, AlertVerifyResponse};

/// `POST /alerts/trigger` -- manually surface the console's primary
/// scenario as an alert banner, without running the incident pipeline.
/// Front-end demos and walkthroughs use this to preview a scenario's
/// narrative before a real breach (or `/alerts/verify`) confirms it.
#[utoipa::path(
    post,
    path = "/alerts/trigger",
    tag = "Alerts",
    summary = "Manually trigger the primary alert scenario",
    responses(
        (status = 200, description = "Alert raised", body = AlertTriggerResponse)
    )
)]
pub async fn trigger(State(state): State<AppState>) -> impl IntoResponse {
    let scenario = {
        let mut guard = state.state.lock();
        let scenario = guard
            .scenarios
            .first()
            .cloned()
            .expect("at least one scenario is always seeded");
        let label = format!("[{}] {} (manually triggered)", Utc::now().format("%H:%M:%S"), scenario.title);
        guard.record_alert(label.clone(), scenario.clone());
        guard.push_feed(label);
        scenario
    };

    Json(AlertTriggerResponse {
        hypotheses: scenario.hypotheses.clone(),
        evidence: scenario.evidences.clone(),
        actions: scenario.actions.clone(),
        feed_line: format!("[{}] {} (manually triggered)", Utc::now().format("%H:%M:%S"), scenario.title),
        scenario,
        verify_enabled: true,
    })
}

/// `POST /alerts/verify` -- a single point-in-time read of the configured
/// metrics source, independent of the Sampling Monitor's windowed
/// evaluation. Consumers must not assume the two agree.
#[utoipa::path(
    post,
    path = "/alerts/verify",
    tag = "Alerts",
    summary = "Verify current metrics against configured thresholds",
    responses(
        (status = 200, description = "Current sample", body = AlertVerifyResponse),
        (status = 400, description = "Metrics source is not configured"),
        (status = 502, description = "Metrics source unreachable")
    )
)]
pub async fn verify(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    let (url, http_query, cpu_query, http_threshold, cpu_threshold) = {
        let guard = state.state.lock();
        if !guard.metrics.is_configured() {
            return Err(incident_core::CoreError::not_configured("metrics source is not configured").into());
        }
        (
            guard.metrics.url.clone(),
            guard.metrics.http_query.clone(),
            guard.metrics.cpu_query.clone(),
            guard.metrics.http_threshold,
            guard.metrics.cpu_threshold,
        )
    };

    let http = state.metrics.instant_value(&url, &http_query).await?;
    let cpu = state.metrics.instant_value(&url, &cpu_query).await?;

    let status = if http > http_threshold || cpu > cpu_threshold {
        "pending"
    } else {
        "recovered"
    };

    Ok(Json(AlertVerifyResponse {
        http,
        cpu,
        http_threshold,
        cpu_threshold,
        status,
    }))
}
