use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an [`ActionExecution`]. `Executed` and `Deferred` are
/// terminal; `execute` on an already-`Executed` plan is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Executed,
    Deferred,
}

/// The outcome of dispatching a single action string to the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActionExecutionResult {
    pub action: String,
    pub status: String,
    pub detail: String,
    pub executed_at: DateTime<Utc>,
}

/// An approvable plan of action strings queued from an [`IncidentReport`].
///
/// Invariant: `results` is empty unless `status == Executed`, and
/// `executed_at` is set if and only if `status == Executed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActionExecution {
    pub id: Uuid,
    pub report_id: Uuid,
    pub scenario_code: String,
    pub scenario_title: String,
    pub created_at: DateTime<Utc>,
    pub actions: Vec<String>,
    pub status: ActionStatus,
    pub executed_at: Option<DateTime<Utc>>,
    pub results: Vec<ActionExecutionResult>,
}

impl ActionExecution {
    /// Build a new, pending execution from a set of already-trimmed,
    /// non-empty action strings.
    #[must_use]
    pub fn new_pending(
        report_id: Uuid,
        scenario_code: impl Into<String>,
        scenario_title: impl Into<String>,
        created_at: DateTime<Utc>,
        actions: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            report_id,
            scenario_code: scenario_code.into(),
            scenario_title: scenario_title.into(),
            created_at,
            actions,
            status: ActionStatus::Pending,
            executed_at: None,
            results: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.status == ActionStatus::Executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pending_has_no_results_or_timestamp() {
        let exec = ActionExecution::new_pending(
            Uuid::new_v4(),
            "http_5xx_surge",
            "Nginx 5xx surge",
            Utc::now(),
            vec!["roll back".to_string()],
        );
        assert_eq!(exec.status, ActionStatus::Pending);
        assert!(exec.results.is_empty());
        assert!(exec.executed_at.is_none());
        assert!(!exec.is_executed());
    }
}
