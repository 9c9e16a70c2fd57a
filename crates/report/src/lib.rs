//! Incident report generator.
//!
//! Calls an OpenAI-compatible chat completions endpoint with a RAG-augmented
//! prompt when an API key is configured, falling back to a deterministic
//! template otherwise (or whenever the LLM call fails or its reply cannot
//! be parsed as the expected JSON schema).

use std::time::Duration;

use incident_core::{AlertScenario, DocumentStatus, MetricSample};
use incident_knowledge::KnowledgeStore;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MODEL: &str = "gpt-4o-mini";
const ACTION_CONTEXT_LIMIT: usize = 5;

const SYSTEM_PROMPT: &str = "You are an SRE incident analyst. Using the monitoring data provided, \
write an analysis covering the cause, blast radius, immediate actions, and follow-up steps. \
Respond with exactly this JSON schema and nothing else:\n\
{\n  \"summary\": \"...\",\n  \"root_cause\": \"...\",\n  \"impact\": \"...\",\n  \
\"action_plan\": [\"...\"],\n  \"follow_up\": [\"...\"]\n}";

/// The five narrative fields a generation pass produces, before action
/// prioritization is merged in.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GeneratedAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub root_cause: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub action_plan: Vec<String>,
    #[serde(default)]
    pub follow_up: Vec<String>,
}

pub struct ReportGenerator {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl ReportGenerator {
    /// `api_key: None` always takes the deterministic fallback path.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(api_key, "https://api.openai.com/v1/chat/completions")
    }

    #[must_use]
    pub fn with_endpoint(api_key: Option<String>, endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            api_key,
            endpoint: endpoint.into(),
        }
    }

    /// Produce a finished analysis for `scenario`/`sample`, consulting
    /// `knowledge` for RAG context and previously-approved actions.
    ///
    /// `api_key_override` takes precedence over the key this generator was
    /// constructed with — callers that track a live, mutable AI setting
    /// (the HTTP layer's `/ai/save`) pass the current value here on every
    /// call rather than rebuilding the generator.
    pub async fn generate(
        &self,
        knowledge: &KnowledgeStore,
        scenario: &AlertScenario,
        sample: &MetricSample,
        api_key_override: Option<&str>,
    ) -> GeneratedAnalysis {
        let context = knowledge
            .build_context_for_scenario(scenario, ACTION_CONTEXT_LIMIT)
            .await;

        let api_key = api_key_override.or(self.api_key.as_deref());
        let mut analysis = match api_key {
            Some(api_key) => match self.call_llm(api_key, scenario, sample, &context).await {
                Ok(analysis) => analysis,
                Err(reason) => {
                    info!(reason = %reason, "LLM generation unavailable, using fallback template");
                    Self::fallback_analysis(scenario, sample)
                }
            },
            None => Self::fallback_analysis(scenario, sample),
        };

        let approved = knowledge
            .recent_actions(&scenario.code, DocumentStatus::Executed, ACTION_CONTEXT_LIMIT)
            .await;
        analysis.action_plan = Self::prioritize_actions(&approved, &analysis.action_plan, &scenario.actions);
        analysis
    }

    /// Merge previously-approved actions first, then the generator's
    /// proposed actions, deduplicating by exact string match and keeping
    /// first occurrence. Falls back to the scenario's static actions if
    /// the merge is empty.
    fn prioritize_actions(approved: &[String], proposed: &[String], scenario_actions: &[String]) -> Vec<String> {
        let mut merged = Vec::new();
        for action in approved.iter().chain(proposed.iter()) {
            if !merged.contains(action) {
                merged.push(action.clone());
            }
        }
        if merged.is_empty() {
            scenario_actions.to_vec()
        } else {
            merged
        }
    }

    fn build_user_prompt(scenario: &AlertScenario, sample: &MetricSample, context: &str) -> String {
        let hypotheses = list_or_none(&scenario.hypotheses);
        let evidences = list_or_none(&scenario.evidences);
        let actions = list_or_none(&scenario.actions);
        let context_block = if context.is_empty() {
            String::new()
        } else {
            format!("\n\nRelevant history:\n{context}")
        };

        format!(
            "Incident Title: {title}\n\
             Source Metric: {source}\n\
             Detected At (UTC): {timestamp}\n\
             HTTP Error Rate: {http:.4} (threshold {http_thr:.4})\n\
             CPU Usage: {cpu:.4} (threshold {cpu_thr:.4})\n\
             \n\
             Hypotheses:\n{hypotheses}\n\
             \n\
             Evidence:\n{evidences}\n\
             \n\
             Recommended Actions (playbook):\n{actions}{context_block}",
            title = scenario.title,
            source = scenario.source,
            timestamp = sample.timestamp.to_rfc3339(),
            http = sample.http,
            http_thr = sample.http_threshold,
            cpu = sample.cpu,
            cpu_thr = sample.cpu_threshold,
        )
    }

    async fn call_llm(
        &self,
        api_key: &str,
        scenario: &AlertScenario,
        sample: &MetricSample,
        context: &str,
    ) -> Result<GeneratedAnalysis, String> {
        let prompt = Self::build_user_prompt(scenario, sample, context);

        let request_body = serde_json::json!({
            "model": MODEL,
            "temperature": 0.3,
            "max_tokens": 900,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {body}"));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("response was not valid JSON: {e}"))?;

        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| format!("unexpected response shape: {body}"))?;

        Self::parse_analysis(content)
    }

    /// Parse the model's reply as [`GeneratedAnalysis`]. On failure,
    /// retry against the largest `{...}` substring found in the reply.
    fn parse_analysis(content: &str) -> Result<GeneratedAnalysis, String> {
        let trimmed = content.trim();

        if let Ok(analysis) = serde_json::from_str::<GeneratedAnalysis>(trimmed) {
            return Ok(analysis);
        }

        let start = trimmed.find('{');
        let end = trimmed.rfind('}');
        match (start, end) {
            (Some(start), Some(end)) if start < end => {
                let fragment = &trimmed[start..=end];
                serde_json::from_str::<GeneratedAnalysis>(fragment)
                    .map_err(|e| format!("failed to parse extracted JSON fragment: {e}. raw: {content}"))
            }
            _ => Err(format!("reply contained no JSON object: {content}")),
        }
    }

    fn fallback_analysis(scenario: &AlertScenario, sample: &MetricSample) -> GeneratedAnalysis {
        let summary = format!(
            "At {timestamp} UTC, '{title}' breached its HTTP error-rate threshold of {http_thr:.2} \
             and CPU usage rose to {cpu:.2}.",
            timestamp = sample.timestamp,
            title = scenario.title,
            http_thr = sample.http_threshold,
            cpu = sample.cpu,
        );
        let root_cause = scenario
            .hypotheses
            .first()
            .cloned()
            .unwrap_or_else(|| "Further investigation is required.".to_string());
        let impact = "If left unresolved, this risks cascading into user-facing latency and outages.".to_string();
        let mut action_plan = scenario.actions.clone();
        if action_plan.is_empty() {
            action_plan.push("Stand up an incident response procedure.".to_string());
        }
        action_plan.push("Check metrics dashboard and application logs for further anomalies.".to_string());
        let follow_up = vec!["Review recent deploy/infrastructure changes for relevance.".to_string()];

        GeneratedAnalysis {
            summary,
            root_cause,
            impact,
            action_plan,
            follow_up,
        }
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "- (none)".to_string()
    } else {
        items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use incident_core::default_scenarios;

    fn sample() -> MetricSample {
        MetricSample::new(0.12, 0.05, 0.9, 0.8)
    }

    #[test]
    fn parse_analysis_accepts_plain_json() {
        let content = r#"{"summary":"s","root_cause":"r","impact":"i","action_plan":["a"],"follow_up":["f"]}"#;
        let analysis = ReportGenerator::parse_analysis(content).unwrap();
        assert_eq!(analysis.summary, "s");
        assert_eq!(analysis.action_plan, vec!["a".to_string()]);
    }

    #[test]
    fn parse_analysis_extracts_largest_brace_substring() {
        let content = "Sure, here you go:\n```json\n{\"summary\":\"s\",\"root_cause\":\"r\",\"impact\":\"i\",\"action_plan\":[],\"follow_up\":[]}\n```\nLet me know if you need anything else.";
        let analysis = ReportGenerator::parse_analysis(content).unwrap();
        assert_eq!(analysis.summary, "s");
    }

    #[test]
    fn parse_analysis_errors_without_any_json() {
        let err = ReportGenerator::parse_analysis("no json here at all").unwrap_err();
        assert!(err.contains("no JSON object"));
    }

    #[test]
    fn fallback_analysis_uses_first_hypothesis_as_root_cause() {
        let scenario = &default_scenarios()[0];
        let analysis = ReportGenerator::fallback_analysis(scenario, &sample());
        assert_eq!(analysis.root_cause, scenario.hypotheses[0]);
        assert_eq!(analysis.action_plan.len(), scenario.actions.len() + 1);
        assert_eq!(analysis.action_plan[..scenario.actions.len()], scenario.actions[..]);
        assert_eq!(
            analysis.action_plan.last().unwrap(),
            "Check metrics dashboard and application logs for further anomalies."
        );
    }

    #[test]
    fn prioritize_actions_dedupes_preserving_first_occurrence() {
        let approved = vec!["roll back".to_string(), "scale up".to_string()];
        let proposed = vec!["scale up".to_string(), "notify pm".to_string()];
        let scenario_actions = vec!["static action".to_string()];
        let merged = ReportGenerator::prioritize_actions(&approved, &proposed, &scenario_actions);
        assert_eq!(
            merged,
            vec!["roll back".to_string(), "scale up".to_string(), "notify pm".to_string()]
        );
    }

    #[test]
    fn prioritize_actions_falls_back_to_scenario_actions_when_empty() {
        let merged = ReportGenerator::prioritize_actions(&[], &[], &["static action".to_string()]);
        assert_eq!(merged, vec!["static action".to_string()]);
    }

    #[tokio::test]
    async fn generate_without_api_key_uses_fallback_and_merges_approved_actions() {
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let scenario = default_scenarios()[0].clone();

        let mut execution = incident_core::ActionExecution::new_pending(
            uuid::Uuid::new_v4(),
            scenario.code.clone(),
            scenario.title.clone(),
            Utc::now(),
            vec!["previously approved action".to_string()],
        );
        execution.status = incident_core::ActionStatus::Executed;
        execution.executed_at = Some(Utc::now());
        knowledge.record_executed(&execution).await;

        let generator = ReportGenerator::new(None);
        let analysis = generator.generate(&knowledge, &scenario, &sample(), None).await;

        assert_eq!(analysis.action_plan[0], "previously approved action");
    }
}
