use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of source material a [`KnowledgeDocument`] was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Scenario,
    ActionExecution,
    IncidentReport,
    Uploaded,
}

/// Lifecycle status recorded against the action plan or report a document
/// describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Reference,
    Executed,
    Deferred,
    Report,
}

/// Recovery state recorded against an executed action plan's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RecoveryState {
    Pending,
    Recovered,
    NotExecuted,
    NotApplicable,
}

/// Free-form metadata attached to a [`KnowledgeDocument`]. Modeled as an
/// explicit struct (rather than a raw JSON map) for the fields the store
/// itself reasons about, with an escape hatch for upload-supplied extras.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DocumentMetadata {
    #[serde(rename = "type")]
    pub doc_type: Option<DocumentType>,
    pub scenario_code: Option<String>,
    pub status: Option<DocumentStatus>,
    pub recovery_status: Option<RecoveryState>,
    pub title: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub recovered_at: Option<DateTime<Utc>>,
    pub recovery_metrics: Option<serde_json::Value>,
    pub source_filename: Option<String>,
    /// Flat string extras from uploaded documents that don't map onto a
    /// known field.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single persisted record in the knowledge store, keyed by a stable,
/// typed `doc_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct KnowledgeDocument {
    pub doc_key: String,
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl KnowledgeDocument {
    #[must_use]
    pub fn matches_filter(&self, filter: &HashMap<String, serde_json::Value>) -> bool {
        for (key, value) in filter {
            let actual = self.metadata_value(key);
            if actual.as_ref() != Some(value) {
                return false;
            }
        }
        true
    }

    fn metadata_value(&self, key: &str) -> Option<serde_json::Value> {
        match key {
            "scenario_code" => self.metadata.scenario_code.clone().map(Into::into),
            "status" => self
                .metadata
                .status
                .map(|s| serde_json::to_value(s).unwrap_or_default()),
            "type" => self
                .metadata
                .doc_type
                .map(|t| serde_json::to_value(t).unwrap_or_default()),
            "recovery_status" => self
                .metadata
                .recovery_status
                .map(|r| serde_json::to_value(r).unwrap_or_default()),
            _ => self.metadata.extra.get(key).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(scenario: &str, status: DocumentStatus) -> KnowledgeDocument {
        KnowledgeDocument {
            doc_key: "scenario:x".to_string(),
            content: "content".to_string(),
            metadata: DocumentMetadata {
                scenario_code: Some(scenario.to_string()),
                status: Some(status),
                ..Default::default()
            },
        }
    }

    #[test]
    fn filter_matches_on_scenario_and_status() {
        let d = doc("http_5xx_surge", DocumentStatus::Executed);
        let mut filter = HashMap::new();
        filter.insert(
            "scenario_code".to_string(),
            serde_json::json!("http_5xx_surge"),
        );
        filter.insert("status".to_string(), serde_json::json!("executed"));
        assert!(d.matches_filter(&filter));
    }

    #[test]
    fn filter_rejects_mismatch() {
        let d = doc("http_5xx_surge", DocumentStatus::Executed);
        let mut filter = HashMap::new();
        filter.insert("status".to_string(), serde_json::json!("deferred"));
        assert!(!d.matches_filter(&filter));
    }
}
