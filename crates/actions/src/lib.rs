//! Action execution service.
//!
//! Queues an [`ActionExecution`] from a finished [`IncidentReport`], then
//! drives it through its one-shot lifecycle: dispatch each action string to
//! the simulator sequentially, open a [`RecoveryCheck`] on success, and
//! write the outcome back to the knowledge store. Execution and defer are
//! both idempotent on an already-executed plan.

use incident_core::{
    ActionExecution, ActionExecutionResult, ActionStatus, CoreError, CoreResult, IncidentReport,
    RecoveryCheck, RecoveryState, StateStore,
};
use incident_knowledge::KnowledgeStore;
use incident_simulator::SimulatorClient;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Queue a new, pending [`ActionExecution`] for `report`, if it carries any
/// non-empty action strings after trimming. A report with no actionable
/// items produces no execution.
#[must_use]
pub fn queue_from_report(state: &StateStore, report: &IncidentReport) -> Option<ActionExecution> {
    let actions: Vec<String> = report
        .action_items
        .iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if actions.is_empty() {
        return None;
    }

    let execution = ActionExecution::new_pending(
        report.id,
        report.scenario_code.clone(),
        report.title.clone(),
        report.created_at,
        actions,
    );

    let mut guard = state.lock();
    guard.action_executions.push(execution.clone());
    guard.push_feed(format!(
        "[{}] queued action plan for '{}' ({} action(s))",
        chrono::Utc::now().format("%H:%M:%S"),
        execution.scenario_title,
        execution.actions.len()
    ));
    drop(guard);

    Some(execution)
}

/// Dispatch a pending action plan to the simulator, one action at a time.
///
/// Idempotent: calling this on an already-`executed` plan returns it
/// unchanged rather than re-dispatching. A failure from the simulator
/// aborts the whole plan and leaves it `pending` — the caller sees the
/// error as a 400 per the console's error taxonomy.
///
/// # Errors
///
/// Returns [`CoreError::BadRequest`] if no execution with `id` exists or
/// the simulator rejects any action in the plan.
#[instrument(skip(state, knowledge, simulator))]
pub async fn execute_pending(
    state: &StateStore,
    knowledge: &KnowledgeStore,
    simulator: &SimulatorClient,
    id: Uuid,
) -> CoreResult<ActionExecution> {
    let actions = {
        let guard = state.lock();
        let execution = find(&guard, id)?;
        if execution.status == ActionStatus::Executed {
            return Ok(execution.clone());
        }
        execution.actions.clone()
    };

    let mut results = Vec::with_capacity(actions.len());
    for action in &actions {
        let outcome = simulator.execute(id, action).await?;
        results.push(ActionExecutionResult {
            action: action.clone(),
            status: outcome.status,
            detail: outcome.detail,
            executed_at: outcome.executed_at,
        });
    }

    let execution = {
        let mut guard = state.lock();
        let execution = find_mut(&mut guard, id)?;
        if execution.status == ActionStatus::Executed {
            return Ok(execution.clone());
        }
        execution.status = ActionStatus::Executed;
        execution.executed_at = Some(chrono::Utc::now());
        execution.results = results;

        let recovery_check =
            RecoveryCheck::open(execution.id, &execution.scenario_code, &execution.scenario_title);
        guard.recovery_checks.push(recovery_check);
        let execution = execution.clone();
        guard.push_feed(format!(
            "[{}] executed action plan for '{}'",
            chrono::Utc::now().format("%H:%M:%S"),
            execution.scenario_title
        ));
        execution
    };

    info!(execution_id = %execution.id, "action plan executed, recovery check opened");
    knowledge.record_executed(&execution).await;

    Ok(execution)
}

/// Defer a pending action plan. Idempotent on an already-executed plan, in
/// which case it is returned unchanged rather than being overwritten.
///
/// # Errors
///
/// Returns [`CoreError::BadRequest`] if no execution with `id` exists.
#[instrument(skip(state, knowledge))]
pub async fn defer_execution(
    state: &StateStore,
    knowledge: &KnowledgeStore,
    id: Uuid,
) -> CoreResult<ActionExecution> {
    let execution = {
        let mut guard = state.lock();
        let execution = find_mut(&mut guard, id)?;
        if execution.status == ActionStatus::Executed {
            return Ok(execution.clone());
        }
        execution.status = ActionStatus::Deferred;
        execution.executed_at = None;
        execution.results = Vec::new();
        let execution = execution.clone();
        guard.push_feed(format!(
            "[{}] deferred action plan for '{}'",
            chrono::Utc::now().format("%H:%M:%S"),
            execution.scenario_title
        ));
        execution
    };

    warn!(execution_id = %execution.id, "action plan deferred");
    knowledge.record_deferred(&execution).await;

    Ok(execution)
}

/// Resolve every pending [`RecoveryCheck`], stamping `resolved_at` and
/// writing `recovered` to the knowledge store. Called by the Monitor once
/// it observes a clear window.
///
/// # Errors
///
/// Never returns an error from the state mutation; knowledge-store
/// write-back failures are swallowed by the store itself per its contract.
pub async fn resolve_recoveries(
    state: &StateStore,
    knowledge: &KnowledgeStore,
    resolved_at: chrono::DateTime<chrono::Utc>,
    recovery_metrics: Option<serde_json::Value>,
) -> Vec<RecoveryCheck> {
    let resolved: Vec<RecoveryCheck> = {
        let mut guard = state.lock();
        let mut resolved = Vec::new();
        for check in guard.recovery_checks.iter_mut() {
            if check.status == incident_core::RecoveryStatus::Pending {
                check.resolve(resolved_at);
                resolved.push(check.clone());
            }
        }
        if !resolved.is_empty() {
            guard.push_feed(format!(
                "[{}] {} recovery check(s) cleared",
                resolved_at.format("%H:%M:%S"),
                resolved.len()
            ));
        }
        resolved
    };

    for check in &resolved {
        knowledge
            .mark_recovery(
                check.execution_id,
                RecoveryState::Recovered,
                resolved_at,
                recovery_metrics.clone(),
            )
            .await;
    }

    resolved
}

fn find(state: &incident_core::AppState, id: Uuid) -> CoreResult<&ActionExecution> {
    state
        .action_executions
        .as_slice()
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| CoreError::bad_request(format!("unknown action execution: {id}")))
}

fn find_mut(state: &mut incident_core::AppState, id: Uuid) -> CoreResult<&mut ActionExecution> {
    state
        .action_executions
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| CoreError::bad_request(format!("unknown action execution: {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use incident_core::{AppState, MetricSample};
    use uuid::Uuid as UuidT;

    fn report_with_actions(actions: Vec<&str>) -> IncidentReport {
        IncidentReport {
            id: UuidT::new_v4(),
            scenario_code: "http_5xx_surge".to_string(),
            title: "Nginx 5xx surge".to_string(),
            created_at: Utc::now(),
            metrics: MetricSample::new(0.12, 0.05, 0.2, 0.8),
            summary: String::new(),
            root_cause: String::new(),
            impact: String::new(),
            action_items: actions.into_iter().map(str::to_string).collect(),
            follow_up: Vec::new(),
            report_body: String::new(),
            recipients_sent: vec!["chat".to_string()],
            recipients_missing: Vec::new(),
        }
    }

    #[tokio::test]
    async fn queue_from_report_skips_empty_actions() {
        let state = StateStore::new(AppState::default());
        let report = report_with_actions(vec!["  ", ""]);
        assert!(queue_from_report(&state, &report).is_none());
    }

    #[tokio::test]
    async fn queue_from_report_creates_pending_execution() {
        let state = StateStore::new(AppState::default());
        let report = report_with_actions(vec!["roll back checkout-service"]);
        let execution = queue_from_report(&state, &report).unwrap();
        assert_eq!(execution.status, ActionStatus::Pending);
        assert_eq!(state.snapshot().action_executions.len(), 1);
    }

    #[tokio::test]
    async fn execute_pending_unknown_id_is_bad_request() {
        let state = StateStore::new(AppState::default());
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let simulator = SimulatorClient::new("http://127.0.0.1:1");
        let err = execute_pending(&state, &knowledge, &simulator, UuidT::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));
    }

    #[tokio::test]
    async fn defer_execution_unknown_id_is_bad_request() {
        let state = StateStore::new(AppState::default());
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let err = defer_execution(&state, &knowledge, UuidT::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));
    }

    #[tokio::test]
    async fn defer_execution_sets_status_and_clears_results() {
        let state = StateStore::new(AppState::default());
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let report = report_with_actions(vec!["roll back"]);
        let execution = queue_from_report(&state, &report).unwrap();

        let deferred = defer_execution(&state, &knowledge, execution.id).await.unwrap();
        assert_eq!(deferred.status, ActionStatus::Deferred);
        assert!(deferred.executed_at.is_none());
        assert!(deferred.results.is_empty());
    }

    #[tokio::test]
    async fn defer_after_executed_is_idempotent_noop() {
        let state = StateStore::new(AppState::default());
        {
            let mut guard = state.lock();
            let mut execution = ActionExecution::new_pending(
                UuidT::new_v4(),
                "http_5xx_surge",
                "Nginx 5xx surge",
                Utc::now(),
                vec!["roll back".to_string()],
            );
            execution.status = ActionStatus::Executed;
            execution.executed_at = Some(Utc::now());
            guard.action_executions.push(execution);
        }
        let id = state.snapshot().action_executions[0].id;

        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let result = defer_execution(&state, &knowledge, id).await.unwrap();
        assert_eq!(result.status, ActionStatus::Executed);
    }

    #[tokio::test]
    async fn resolve_recoveries_marks_pending_checks() {
        let state = StateStore::new(AppState::default());
        {
            let mut guard = state.lock();
            guard
                .recovery_checks
                .push(RecoveryCheck::open(UuidT::new_v4(), "http_5xx_surge", "Nginx 5xx surge"));
        }
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();

        let resolved = resolve_recoveries(&state, &knowledge, Utc::now(), None).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, incident_core::RecoveryStatus::Recovered);
    }
}
