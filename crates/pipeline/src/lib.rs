//! Incident pipeline.
//!
//! The path from a detected breach to a finished [`IncidentReport`]: invoke
//! the report generator, queue an approvable action plan, and attempt
//! delivery through every configured notification sink — currently chat
//! only. Delivery failures are captured per-sink rather than failing the
//! whole incident; a report with any missing delivery is queued for later
//! acknowledgement.

use chrono::Utc;
use incident_core::{
    render_report_body, ChatSettings, CoreError, CoreResult, IncidentReport, MetricSample,
    NotificationPreferences, StateStore,
};
use incident_chat::ChatClient;
use incident_knowledge::KnowledgeStore;
use incident_report::ReportGenerator;
use tracing::{info, warn};
use uuid::Uuid;

/// Run the pipeline for one detected breach: generate the report, queue its
/// action plan, attempt chat delivery, and record the result.
///
/// # Errors
///
/// Returns [`CoreError::BadRequest`] if `scenario_code` does not name a
/// seeded scenario. Delivery failures never surface as an error here — they
/// are captured in the returned report's `recipients_missing`.
pub async fn run_pipeline(
    state: &StateStore,
    knowledge: &KnowledgeStore,
    report_generator: &ReportGenerator,
    chat_client: &ChatClient,
    scenario_code: &str,
    sample: MetricSample,
) -> CoreResult<IncidentReport> {
    let (scenario, chat_settings, preferences, api_key) = {
        let guard = state.lock();
        let scenario = guard
            .scenario_by_code(scenario_code)
            .cloned()
            .ok_or_else(|| CoreError::bad_request(format!("unknown scenario code: {scenario_code}")))?;
        let api_key = guard.ai.is_configured().then(|| guard.ai.api_key.clone());
        (scenario, guard.chat.clone(), guard.preferences.clone(), api_key)
    };

    let analysis = report_generator
        .generate(knowledge, &scenario, &sample, api_key.as_deref())
        .await;

    let action_items = if analysis.action_plan.is_empty() {
        scenario.actions.clone()
    } else {
        analysis.action_plan.clone()
    };

    let report_body = render_report_body(
        &scenario.title,
        &sample,
        &analysis.summary,
        &analysis.root_cause,
        &analysis.impact,
        &action_items,
        &analysis.follow_up,
    );

    let mut report = IncidentReport {
        id: Uuid::new_v4(),
        scenario_code: scenario.code.clone(),
        title: scenario.title.clone(),
        created_at: Utc::now(),
        metrics: sample,
        summary: analysis.summary,
        root_cause: analysis.root_cause,
        impact: analysis.impact,
        action_items,
        follow_up: analysis.follow_up,
        report_body,
        recipients_sent: Vec::new(),
        recipients_missing: Vec::new(),
    };

    incident_actions::queue_from_report(state, &report);

    deliver_chat(chat_client, &chat_settings, &preferences, &mut report).await;

    knowledge.record_report(&report).await;

    {
        let mut guard = state.lock();
        let label = format!("[{}] {}", Utc::now().format("%H:%M:%S"), scenario.title);
        guard.record_alert(label, scenario.clone());
        guard.last_report = Some(report.clone());
        guard.push_feed(format!(
            "[{}] incident report generated for '{}'",
            Utc::now().format("%H:%M:%S"),
            report.title
        ));
        if !report.recipients_missing.is_empty() {
            guard.pending_reports.push(report.clone());
        }
    }

    info!(
        report_id = %report.id,
        scenario_code = %report.scenario_code,
        sent = report.recipients_sent.len(),
        missing = report.recipients_missing.len(),
        "incident pipeline finished"
    );

    Ok(report)
}

/// Attempt chat delivery of `report`'s narrative, recording the outcome
/// into `sent`/`missing` buckets on `out`. Split from the rest of the
/// report so additional sinks can be added the same way later.
async fn deliver_chat(
    chat_client: &ChatClient,
    chat_settings: &ChatSettings,
    preferences: &NotificationPreferences,
    report: &mut IncidentReport,
) {
    if !preferences.chat_enabled {
        report.recipients_missing.push("chat: notifications disabled".to_string());
        return;
    }
    if !chat_settings.is_configured() {
        report.recipients_missing.push("chat: not configured".to_string());
        return;
    }

    let text = format!("*{}*\n```\n{}\n```", report.title, report.report_body);
    match chat_client
        .post(&chat_settings.token, &chat_settings.channel, &text)
        .await
    {
        Ok(_) => report.recipients_sent.push("chat".to_string()),
        Err(err) => {
            warn!(error = %err, "chat delivery failed");
            report.recipients_missing.push(format!("chat: {err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incident_core::AppState;

    fn window_sample() -> MetricSample {
        MetricSample::new(0.12, 0.05, 0.2, 0.8)
    }

    #[tokio::test]
    async fn unknown_scenario_code_is_bad_request() {
        let state = StateStore::new(AppState::default());
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let generator = ReportGenerator::new(None);
        let chat = ChatClient::new();

        let err = run_pipeline(&state, &knowledge, &generator, &chat, "not_a_scenario", window_sample())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));
    }

    #[tokio::test]
    async fn missing_chat_config_records_delivery_as_missing_and_queues_report() {
        let state = StateStore::new(AppState::default());
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let generator = ReportGenerator::new(None);
        let chat = ChatClient::new();

        let report = run_pipeline(&state, &knowledge, &generator, &chat, "http_5xx_surge", window_sample())
            .await
            .unwrap();

        assert!(report.recipients_sent.is_empty());
        assert_eq!(report.recipients_missing.len(), 1);
        assert!(report.recipients_missing[0].contains("chat"));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.pending_reports.len(), 1);
        assert_eq!(snapshot.action_executions.len(), 1);
    }

    #[tokio::test]
    async fn disabled_chat_preference_records_disabled_reason() {
        let state = StateStore::new(AppState::default());
        {
            let mut guard = state.lock();
            guard.preferences.chat_enabled = false;
        }
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let generator = ReportGenerator::new(None);
        let chat = ChatClient::new();

        let report = run_pipeline(&state, &knowledge, &generator, &chat, "cpu_spike_core", window_sample())
            .await
            .unwrap();

        assert_eq!(report.recipients_missing, vec!["chat: notifications disabled".to_string()]);
    }
}
