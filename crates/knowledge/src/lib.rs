//! Persistent RAG-style knowledge store.
//!
//! Documents are keyed by a stable, typed `doc_key` and held in memory
//! behind a single mutex, with the full map rewritten to disk (temp file
//! + atomic rename) after every mutation. No vector index is maintained —
//! `search` always degrades to the metadata-filter + recency-scan path the
//! console falls back to when a similarity index is unavailable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use incident_core::{
    ActionExecution, AlertScenario, CoreError, DocumentMetadata, DocumentStatus, DocumentType,
    IncidentReport, KnowledgeDocument, RecoveryState,
};
use tokio::sync::Mutex;
use tracing::{error, warn};

const DOCUMENTS_FILE: &str = "documents.json";

fn format_summary(values: &[String]) -> String {
    values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(4)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A JSON-file-backed map from `doc_key` to [`KnowledgeDocument`].
///
/// Cheap to clone: the document map lives behind an `Arc<Mutex<_>>`, so
/// every clone reads and writes the same persisted store, the same way
/// [`incident_core::StateStore`] shares one `AppState` mutex.
#[derive(Clone)]
pub struct KnowledgeStore {
    data_dir: PathBuf,
    documents: Arc<Mutex<HashMap<String, KnowledgeDocument>>>,
}

impl KnowledgeStore {
    /// Open (and create, if absent) the store rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] if the directory cannot be created.
    /// A corrupt or unreadable `documents.json` is logged and treated as
    /// empty rather than failing startup.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to create knowledge store directory: {e}")))?;

        let documents = load_documents(&data_dir).await;

        Ok(Self {
            data_dir,
            documents: Arc::new(Mutex::new(documents)),
        })
    }

    fn documents_path(&self) -> PathBuf {
        self.data_dir.join(DOCUMENTS_FILE)
    }

    async fn persist(&self, documents: &HashMap<String, KnowledgeDocument>) {
        let values: Vec<&KnowledgeDocument> = documents.values().collect();
        let serialized = match serde_json::to_vec_pretty(&values) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "failed to serialize knowledge store documents");
                return;
            }
        };

        let final_path = self.documents_path();
        let tmp_path = final_path.with_extension("json.tmp");

        if let Err(e) = tokio::fs::write(&tmp_path, &serialized).await {
            error!(error = %e, path = %tmp_path.display(), "failed to write knowledge store temp file");
            return;
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            error!(error = %e, path = %final_path.display(), "failed to rename knowledge store temp file into place");
        }
    }

    /// Insert a document if its key is not already present. Returns
    /// whether the insert actually happened.
    async fn add_document(&self, doc_key: String, content: String, mut metadata: DocumentMetadata) -> bool {
        if metadata.created_at.is_none() {
            metadata.created_at = Some(Utc::now());
        }

        let mut documents = self.documents.lock().await;
        if documents.contains_key(&doc_key) {
            return false;
        }

        documents.insert(
            doc_key.clone(),
            KnowledgeDocument {
                doc_key,
                content,
                metadata,
            },
        );
        self.persist(&documents).await;
        true
    }

    /// Seed one `scenario:<code>` document per scenario. A no-op for
    /// scenarios already present.
    pub async fn bootstrap(&self, scenarios: &[AlertScenario]) {
        for scenario in scenarios {
            let summary = format_summary(&scenario.actions);
            let mut lines = vec![
                format!("Scenario: {} ({})", scenario.title, scenario.code),
                format!("Source metric: {}", scenario.source),
                format!("Description: {}", scenario.description),
                "Leading hypotheses:".to_string(),
            ];
            lines.extend(scenario.hypotheses.iter().map(|h| format!("- {h}")));
            lines.push("Recommended actions:".to_string());
            lines.extend(scenario.actions.iter().map(|a| format!("- {a}")));
            lines.push("Related evidence:".to_string());
            lines.extend(scenario.evidences.iter().map(|e| format!("- {e}")));

            self.add_document(
                format!("scenario:{}", scenario.code),
                lines.join("\n"),
                DocumentMetadata {
                    doc_type: Some(DocumentType::Scenario),
                    scenario_code: Some(scenario.code.clone()),
                    status: Some(DocumentStatus::Reference),
                    title: Some(scenario.title.clone()),
                    summary: Some(if summary.is_empty() { scenario.description.clone() } else { summary }),
                    ..Default::default()
                },
            )
            .await;
        }
    }

    pub async fn record_executed(&self, execution: &ActionExecution) {
        let summary = format_summary(&execution.actions);
        let executed_at = execution.executed_at.unwrap_or_else(Utc::now);

        let mut lines = vec![
            format!("Approved action execution record ({})", execution.scenario_title),
            format!("Scenario code: {}", execution.scenario_code),
            "Result status: executed".to_string(),
            format!("Executed at (UTC): {}", executed_at.to_rfc3339()),
            "Recovery status: pending".to_string(),
            "Action list:".to_string(),
        ];
        if execution.results.is_empty() {
            lines.extend(execution.actions.iter().map(|a| format!("- {a}")));
        } else {
            for result in &execution.results {
                lines.push(format!(
                    "- {} -> status={}, executed_at={}, detail={}",
                    result.action,
                    result.status,
                    result.executed_at.to_rfc3339(),
                    result.detail
                ));
            }
        }

        self.add_document(
            format!("action_execution:{}:executed", execution.id),
            lines.join("\n"),
            DocumentMetadata {
                doc_type: Some(DocumentType::ActionExecution),
                scenario_code: Some(execution.scenario_code.clone()),
                status: Some(DocumentStatus::Executed),
                recovery_status: Some(RecoveryState::Pending),
                title: Some(format!("{} approved actions", execution.scenario_title)),
                summary: Some(format!("Approved actions: {summary}")),
                actions: execution.actions.clone(),
                created_at: Some(executed_at),
                ..Default::default()
            },
        )
        .await;
    }

    pub async fn record_deferred(&self, execution: &ActionExecution) {
        let summary = format_summary(&execution.actions);
        let recorded_at = Utc::now();

        let mut lines = vec![
            format!("Deferred action plan ({})", execution.scenario_title),
            format!("Scenario code: {}", execution.scenario_code),
            "Result status: deferred".to_string(),
            format!("Deferred at (UTC): {}", recorded_at.to_rfc3339()),
            "Recovery status: not_executed".to_string(),
            "Actions requiring review:".to_string(),
        ];
        lines.extend(execution.actions.iter().map(|a| format!("- {a}")));

        self.add_document(
            format!("action_execution:{}:deferred", execution.id),
            lines.join("\n"),
            DocumentMetadata {
                doc_type: Some(DocumentType::ActionExecution),
                scenario_code: Some(execution.scenario_code.clone()),
                status: Some(DocumentStatus::Deferred),
                recovery_status: Some(RecoveryState::NotExecuted),
                title: Some(format!("{} deferred actions", execution.scenario_title)),
                summary: Some(format!("Deferred actions: {summary}")),
                actions: execution.actions.clone(),
                created_at: Some(recorded_at),
                ..Default::default()
            },
        )
        .await;
    }

    /// Stamp recovery metadata onto the executed-action document for
    /// `execution_id`. Returns whether a matching document was found.
    pub async fn mark_recovery(
        &self,
        execution_id: uuid::Uuid,
        status: RecoveryState,
        resolved_at: DateTime<Utc>,
        metrics: Option<serde_json::Value>,
    ) -> bool {
        let doc_key = format!("action_execution:{execution_id}:executed");
        let mut documents = self.documents.lock().await;
        let Some(doc) = documents.get_mut(&doc_key) else {
            return false;
        };
        doc.metadata.recovery_status = Some(status);
        doc.metadata.recovered_at = Some(resolved_at);
        if let Some(metrics) = metrics {
            doc.metadata.recovery_metrics = Some(metrics);
        }
        self.persist(&documents).await;
        true
    }

    pub async fn record_report(&self, report: &IncidentReport) {
        let mut lines = vec![
            format!("Incident report snapshot: {}", report.title),
            format!("Scenario code: {}", report.scenario_code),
            format!("Created at (UTC): {}", report.created_at.to_rfc3339()),
            String::new(),
            "Summary:".to_string(),
            if report.summary.is_empty() { "(no summary)".to_string() } else { report.summary.clone() },
            String::new(),
            "Root cause:".to_string(),
            if report.root_cause.is_empty() { "(no root cause)".to_string() } else { report.root_cause.clone() },
            String::new(),
            "Impact:".to_string(),
            if report.impact.is_empty() { "(no impact assessment)".to_string() } else { report.impact.clone() },
            String::new(),
            "Action items:".to_string(),
        ];
        if report.action_items.is_empty() {
            lines.push("- (none recorded)".to_string());
        } else {
            lines.extend(report.action_items.iter().map(|a| format!("- {a}")));
        }
        lines.push(String::new());
        lines.push("Follow-up:".to_string());
        if report.follow_up.is_empty() {
            lines.push("- (none recorded)".to_string());
        } else {
            lines.extend(report.follow_up.iter().map(|f| format!("- {f}")));
        }

        self.add_document(
            format!("incident_report:{}", report.id),
            lines.join("\n"),
            DocumentMetadata {
                doc_type: Some(DocumentType::IncidentReport),
                scenario_code: Some(report.scenario_code.clone()),
                status: Some(DocumentStatus::Report),
                recovery_status: Some(RecoveryState::NotApplicable),
                title: Some(report.title.clone()),
                summary: Some(if report.summary.is_empty() { report.title.clone() } else { report.summary.clone() }),
                actions: report.action_items.clone(),
                created_at: Some(report.created_at),
                ..Default::default()
            },
        )
        .await;
    }

    /// Insert an uploaded document under `uploaded:<uuid>`, returning the
    /// generated key.
    pub async fn record_upload(&self, content: String, metadata: DocumentMetadata) -> String {
        let doc_key = format!("uploaded:{}", uuid::Uuid::new_v4());
        self.add_document(doc_key.clone(), content, metadata).await;
        doc_key
    }

    /// All documents, most recently created first.
    pub async fn list_documents(&self) -> Vec<KnowledgeDocument> {
        let documents = self.documents.lock().await;
        let mut items: Vec<KnowledgeDocument> = documents.values().cloned().collect();
        items.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
        items
    }

    /// Metadata-filtered, recency-ordered document search. `_query` is
    /// accepted for interface parity with a similarity-search backend but
    /// unused: no vector index is maintained, so this always takes the
    /// degrade path described in the store's contract.
    pub async fn search(
        &self,
        _query: &str,
        limit: usize,
        metadata_filter: &HashMap<String, serde_json::Value>,
    ) -> Vec<KnowledgeDocument> {
        let documents = self.documents.lock().await;
        let mut matches: Vec<KnowledgeDocument> = documents
            .values()
            .filter(|d| d.matches_filter(metadata_filter))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
        matches.truncate(limit);
        matches
    }

    /// Flattened action strings from the most recent matching documents
    /// for `scenario_code`/`status`, in insertion order, duplicates kept.
    pub async fn recent_actions(&self, scenario_code: &str, status: DocumentStatus, limit: usize) -> Vec<String> {
        let documents = self.documents.lock().await;
        let mut entries: Vec<&KnowledgeDocument> = documents.values().collect();
        entries.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));

        let mut actions = Vec::new();
        for doc in entries {
            if doc.metadata.scenario_code.as_deref() != Some(scenario_code) {
                continue;
            }
            if doc.metadata.status != Some(status) {
                continue;
            }
            for action in &doc.metadata.actions {
                actions.push(action.clone());
                if actions.len() >= limit {
                    return actions;
                }
            }
        }
        actions
    }

    /// Build an LLM-prompt context string for a scenario: previously
    /// approved actions first, then unrestricted history for the
    /// scenario, then any recently approved actions across scenarios,
    /// else an empty string.
    pub async fn build_context_for_scenario(&self, scenario: &AlertScenario, limit: usize) -> String {
        let query = [
            scenario.title.as_str(),
            scenario.description.as_str(),
            scenario.source.as_str(),
            &scenario.actions.join(" "),
        ]
        .join(" ");

        let mut filter = HashMap::new();
        filter.insert("scenario_code".to_string(), serde_json::json!(scenario.code));
        filter.insert("status".to_string(), serde_json::json!("executed"));
        let approved = self.search(&query, limit, &filter).await;

        let (documents, prefix) = if approved.is_empty() {
            let mut scenario_only = HashMap::new();
            scenario_only.insert("scenario_code".to_string(), serde_json::json!(scenario.code));
            let related = self.search(&query, limit, &scenario_only).await;
            let prefix = if related.is_empty() { "" } else { "Related history:" };
            (related, prefix)
        } else {
            (approved, "Previously approved actions:")
        };

        if !documents.is_empty() {
            let mut lines = Vec::new();
            if !prefix.is_empty() {
                lines.push(prefix.to_string());
            }
            for doc in &documents {
                let title = doc.metadata.title.clone().unwrap_or_else(|| scenario.title.clone());
                let status = doc
                    .metadata
                    .status
                    .map(|s| serde_json::to_value(s).unwrap_or_default().as_str().unwrap_or("reference").to_string())
                    .unwrap_or_else(|| "reference".to_string());
                let created_at = doc.metadata.created_at.map(|t| t.to_rfc3339()).unwrap_or_default();
                let summary = doc.metadata.summary.clone().unwrap_or_else(|| {
                    doc.content.replace('\n', " ").chars().take(200).collect()
                });
                lines.push(format!("- [{status}] {title} ({created_at})"));
                lines.push(format!("  {summary}"));
            }
            return lines.join("\n");
        }

        let approved_actions = self.recent_actions(&scenario.code, DocumentStatus::Executed, limit).await;
        if !approved_actions.is_empty() {
            let mut lines = vec!["Previously approved actions:".to_string()];
            lines.extend(approved_actions.iter().map(|a| format!("- {a}")));
            return lines.join("\n");
        }

        String::new()
    }
}

async fn load_documents(data_dir: &Path) -> HashMap<String, KnowledgeDocument> {
    let path = data_dir.join(DOCUMENTS_FILE);
    let Ok(bytes) = tokio::fs::read(&path).await else {
        return HashMap::new();
    };

    match serde_json::from_slice::<Vec<KnowledgeDocument>>(&bytes) {
        Ok(docs) => docs.into_iter().map(|d| (d.doc_key.clone(), d)).collect(),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to parse persisted knowledge store documents, starting empty");
            HashMap::new()
        }
    }
}
