use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::action::ActionExecution;
use crate::bounded::Bounded;
use crate::config::{AiSettings, ChatSettings, MetricsSettings, NotificationPreferences};
use crate::recipient::EmailRecipient;
use crate::recovery::RecoveryCheck;
use crate::report::IncidentReport;
use crate::sample::SampleWindow;
use crate::scenario::{default_scenarios, AlertScenario};

/// Feed lines beyond this count are dropped, oldest first.
pub const FEED_CAPACITY: usize = 1000;
/// Pending report queue depth before the oldest unacknowledged report is
/// dropped.
pub const PENDING_REPORTS_CAPACITY: usize = 20;
/// Action execution history depth.
pub const ACTION_EXECUTIONS_CAPACITY: usize = 30;
/// Sampling window depth used by the monitor's breach evaluation.
pub const SAMPLE_WINDOW_CAPACITY: usize = 5;
/// Alert history entries kept before the oldest is dropped.
pub const ALERT_HISTORY_CAPACITY: usize = 1000;

/// Everything the backend holds in memory, guarded by exactly one mutex.
///
/// Handlers and background tasks lock, do the minimal amount of work to
/// read or mutate fields, and drop the guard before performing any network
/// I/O. Nothing in this module ever holds the lock across an `.await`.
pub struct AppState {
    pub metrics: MetricsSettings,
    pub chat: ChatSettings,
    pub ai: AiSettings,
    pub preferences: NotificationPreferences,
    pub scenarios: Vec<AlertScenario>,
    pub monitor_samples: SampleWindow,
    pub active_incidents: HashSet<String>,
    pub feed: Bounded<String>,
    /// Human-readable alert labels, most recent first. Unbounded in the
    /// source system; capped here at [`ALERT_HISTORY_CAPACITY`] for the
    /// same reason the feed is capped.
    pub alert_history: Vec<String>,
    pub last_alert: Option<AlertScenario>,
    pub last_report: Option<IncidentReport>,
    pub pending_reports: Bounded<IncidentReport>,
    pub action_executions: Bounded<ActionExecution>,
    pub recovery_checks: Vec<RecoveryCheck>,
    pub email_recipients: Vec<EmailRecipient>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            metrics: MetricsSettings::default(),
            chat: ChatSettings::default(),
            ai: AiSettings::default(),
            preferences: NotificationPreferences::default(),
            scenarios: default_scenarios(),
            monitor_samples: SampleWindow::new(SAMPLE_WINDOW_CAPACITY),
            active_incidents: HashSet::new(),
            feed: Bounded::new(FEED_CAPACITY),
            alert_history: Vec::new(),
            last_alert: None,
            last_report: None,
            pending_reports: Bounded::new(PENDING_REPORTS_CAPACITY),
            action_executions: Bounded::new(ACTION_EXECUTIONS_CAPACITY),
            recovery_checks: Vec::new(),
            email_recipients: Vec::new(),
        }
    }
}

impl AppState {
    pub fn push_feed(&mut self, line: impl Into<String>) {
        self.feed.push(line.into());
    }

    /// Record a triggered or detected alert: prepend its label to the
    /// history (newest first) and remember the scenario as `last_alert`.
    pub fn record_alert(&mut self, label: impl Into<String>, scenario: AlertScenario) {
        self.alert_history.insert(0, label.into());
        self.alert_history.truncate(ALERT_HISTORY_CAPACITY);
        self.last_alert = Some(scenario);
    }

    #[must_use]
    pub fn scenario_by_code(&self, code: &str) -> Option<&AlertScenario> {
        self.scenarios.iter().find(|s| s.code == code)
    }
}

/// A point-in-time, deep-copied view of [`AppState`] for read-only
/// endpoints (`/state`, `/feed`). Cheap to serialize since it owns its
/// data instead of borrowing from the lock.
#[derive(Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StateSnapshot {
    pub metrics: MetricsSettings,
    pub chat: ChatSettings,
    pub ai_configured: bool,
    pub preferences: NotificationPreferences,
    pub scenarios: Vec<AlertScenario>,
    pub active_incidents: Vec<String>,
    pub alert_history: Vec<String>,
    pub last_alert: Option<AlertScenario>,
    pub last_report: Option<IncidentReport>,
    pub pending_reports: Vec<IncidentReport>,
    pub action_executions: Vec<ActionExecution>,
    pub recovery_checks: Vec<RecoveryCheck>,
    pub email_recipients: Vec<EmailRecipient>,
}

impl From<&AppState> for StateSnapshot {
    fn from(state: &AppState) -> Self {
        Self {
            metrics: state.metrics.clone(),
            chat: state.chat.clone(),
            ai_configured: state.ai.is_configured(),
            preferences: state.preferences.clone(),
            scenarios: state.scenarios.clone(),
            active_incidents: state.active_incidents.iter().cloned().collect(),
            alert_history: state.alert_history.clone(),
            last_alert: state.last_alert.clone(),
            last_report: state.last_report.clone(),
            pending_reports: state.pending_reports.as_slice().to_vec(),
            action_executions: state.action_executions.as_slice().to_vec(),
            recovery_checks: state.recovery_checks.clone(),
            email_recipients: state.email_recipients.clone(),
        }
    }
}

/// A cheaply-cloneable handle to the single shared [`AppState`] mutex.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Mutex<AppState>>,
}

impl StateStore {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Lock the state for a minimal critical section. Callers must not
    /// hold the returned guard across an `.await` point.
    pub fn lock(&self) -> MutexGuard<'_, AppState> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::from(&*self.lock())
    }

    pub fn push_feed(&self, line: impl Into<String>) {
        self.lock().push_feed(line);
    }

    #[must_use]
    pub fn feed(&self) -> Vec<String> {
        self.lock().feed.as_slice().to_vec()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_has_two_scenarios_and_empty_history() {
        let store = StateStore::default();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.scenarios.len(), 2);
        assert!(snapshot.pending_reports.is_empty());
        assert!(snapshot.action_executions.is_empty());
    }

    #[test]
    fn feed_push_is_visible_through_snapshot_and_direct_read() {
        let store = StateStore::default();
        store.push_feed("alert: http_5xx_surge detected");
        assert_eq!(store.feed().len(), 1);
        assert_eq!(store.feed()[0], "alert: http_5xx_surge detected");
    }

    #[test]
    fn feed_evicts_oldest_past_capacity() {
        let store = StateStore::default();
        for i in 0..(FEED_CAPACITY + 10) {
            store.push_feed(format!("line {i}"));
        }
        let feed = store.feed();
        assert_eq!(feed.len(), FEED_CAPACITY);
        assert_eq!(feed[0], "line 10");
    }

    #[test]
    fn active_incidents_track_scenario_codes() {
        let store = StateStore::default();
        {
            let mut guard = store.lock();
            guard.active_incidents.insert("http_5xx_surge".to_string());
        }
        assert!(store
            .snapshot()
            .active_incidents
            .contains(&"http_5xx_surge".to_string()));
    }
}
