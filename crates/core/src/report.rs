use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sample::MetricSample;

/// A structured incident report, created exactly once per detected
/// incident instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IncidentReport {
    pub id: Uuid,
    pub scenario_code: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub metrics: MetricSample,
    pub summary: String,
    pub root_cause: String,
    pub impact: String,
    pub action_items: Vec<String>,
    pub follow_up: Vec<String>,
    pub report_body: String,
    #[serde(default)]
    pub recipients_sent: Vec<String>,
    #[serde(default)]
    pub recipients_missing: Vec<String>,
}

/// Render the fixed template used for `report_body`.
///
/// Missing narrative fields render a fixed placeholder sentence instead of
/// an empty section, matching the console's original report formatter.
#[must_use]
pub fn render_report_body(
    scenario_title: &str,
    sample: &MetricSample,
    summary: &str,
    root_cause: &str,
    impact: &str,
    action_plan: &[String],
    follow_up: &[String],
) -> String {
    let actions_text = if action_plan.is_empty() {
        "- (none)".to_string()
    } else {
        action_plan
            .iter()
            .map(|a| format!("- {a}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let follow_text = if follow_up.is_empty() {
        "- (none)".to_string()
    } else {
        follow_up
            .iter()
            .map(|f| format!("- {f}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let summary = if summary.is_empty() {
        "Summary is not yet available."
    } else {
        summary
    };
    let root_cause = if root_cause.is_empty() {
        "Root cause analysis is pending."
    } else {
        root_cause
    };
    let impact = if impact.is_empty() {
        "Impact is still being assessed."
    } else {
        impact
    };

    format!(
        "Incident: {scenario_title}\n\
         Detected (UTC): {timestamp}\n\
         Metrics: HTTP {http:.4}/{http_thr:.4}, CPU {cpu:.4}/{cpu_thr:.4}\n\
         \n\
         Summary:\n{summary}\n\
         \n\
         Root Cause:\n{root_cause}\n\
         \n\
         Impact:\n{impact}\n\
         \n\
         Action Plan:\n{actions_text}\n\
         \n\
         Follow-up:\n{follow_text}",
        scenario_title = scenario_title,
        timestamp = sample.timestamp.to_rfc3339(),
        http = sample.http,
        http_thr = sample.http_threshold,
        cpu = sample.cpu,
        cpu_thr = sample.cpu_threshold,
    )
}
