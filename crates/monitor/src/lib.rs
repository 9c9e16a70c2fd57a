//! Sampling monitor.
//!
//! A single long-running task that polls the metrics source, maintains the
//! fixed-size sampling window, and debounces threshold breaches into
//! distinct incident instances keyed by cause code. Also owns the recovery
//! side: once a full window clears, every pending recovery check is marked
//! resolved.

use std::time::Duration;

use chrono::Utc;
use incident_chat::ChatClient;
use incident_core::{
    MetricSample, StateStore, CPU_SPIKE_CORE, HTTP_5XX_SURGE, SAMPLE_WINDOW_CAPACITY,
};
use incident_knowledge::KnowledgeStore;
use incident_metrics::MetricsClient;
use incident_report::ReportGenerator;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// How long to wait between ticks. Spec default is 5s; tests override this.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The long-running sampling monitor. Cheap to construct; holds only
/// cloneable handles to the components it polls and drives.
pub struct Monitor {
    state: StateStore,
    metrics: MetricsClient,
    knowledge: KnowledgeStore,
    report_generator: ReportGenerator,
    chat: ChatClient,
    poll_interval: Duration,
}

impl Monitor {
    #[must_use]
    pub fn new(
        state: StateStore,
        metrics: MetricsClient,
        knowledge: KnowledgeStore,
        report_generator: ReportGenerator,
        chat: ChatClient,
    ) -> Self {
        Self {
            state,
            metrics,
            knowledge,
            report_generator,
            chat,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run the poll loop until `stop` is signalled. Always finishes the
    /// in-flight tick before observing the stop signal, matching the
    /// console's cancellation contract.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        info!(interval_secs = self.poll_interval.as_secs(), "sampling monitor starting");
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {
                    if let Err(err) = self.tick().await {
                        warn!(error = %err, "sampling monitor tick failed");
                    }
                }
                result = stop.changed() => {
                    if result.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!("sampling monitor stopped");
    }

    /// Run exactly one poll cycle: fetch, sample, evaluate breaches, detect
    /// new incidents, retire resolved ones, and check recovery.
    ///
    /// Returns `Ok(())` in every case the console's error policy calls
    /// "skip the tick" (unconfigured endpoint, upstream fetch failure) — a
    /// tick is never allowed to stop the monitor.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<(), String> {
        let (url, http_query, cpu_query, http_threshold, cpu_threshold) = {
            let guard = self.state.lock();
            if !guard.metrics.is_configured() {
                return Ok(());
            }
            (
                guard.metrics.url.clone(),
                guard.metrics.http_query.clone(),
                guard.metrics.cpu_query.clone(),
                guard.metrics.http_threshold,
                guard.metrics.cpu_threshold,
            )
        };

        let (http, cpu) = match self.fetch_both(&url, &http_query, &cpu_query).await {
            Ok(values) => values,
            Err(err) => {
                self.state.push_feed(format!(
                    "[{}] metrics fetch failed: {err}",
                    Utc::now().format("%H:%M:%S")
                ));
                return Ok(());
            }
        };

        let sample = MetricSample::new(http, http_threshold, cpu, cpu_threshold);
        let window_full = {
            let mut guard = self.state.lock();
            guard.monitor_samples.push(sample.clone());
            guard.monitor_samples.is_full()
        };
        if !window_full {
            return Ok(());
        }

        let window: Vec<MetricSample> = self.state.lock().monitor_samples.as_slice().to_vec();
        debug_assert_eq!(window.len(), SAMPLE_WINDOW_CAPACITY);

        let http_breach = window.iter().any(MetricSample::http_exceeded);
        let cpu_breach = window.iter().any(MetricSample::cpu_exceeded);

        let mut breach_set: Vec<&str> = Vec::new();
        if http_breach {
            breach_set.push(HTTP_5XX_SURGE);
        }
        if cpu_breach {
            breach_set.push(CPU_SPIKE_CORE);
        }

        let ordered_codes = order_by_delta(&breach_set, &window);
        for code in ordered_codes {
            let already_active = self.state.lock().active_incidents.contains(code);
            if already_active {
                continue;
            }

            let representative = representative_sample(&window, code);
            match self.detect_incident(code, representative).await {
                Ok(()) => {
                    self.state.lock().active_incidents.insert(code.to_string());
                }
                Err(err) => {
                    warn!(scenario_code = code, error = %err, "incident pipeline failed, will retry next tick");
                }
            }
        }

        {
            let mut guard = self.state.lock();
            guard
                .active_incidents
                .retain(|code| breach_set.contains(&code.as_str()));
        }

        if breach_set.is_empty() {
            let latest = window.last().cloned();
            let resolved_at = latest.as_ref().map_or_else(Utc::now, |s| s.timestamp);
            let metrics_value = latest.and_then(|s| serde_json::to_value(&s).ok());
            let resolved =
                incident_actions::resolve_recoveries(&self.state, &self.knowledge, resolved_at, metrics_value)
                    .await;
            if !resolved.is_empty() {
                info!(count = resolved.len(), "recovery checks resolved on clear window");
            }
        }

        Ok(())
    }

    async fn fetch_both(&self, url: &str, http_query: &str, cpu_query: &str) -> Result<(f64, f64), String> {
        let http = self
            .metrics
            .instant_value(url, http_query)
            .await
            .map_err(|e| e.to_string())?;
        let cpu = self
            .metrics
            .instant_value(url, cpu_query)
            .await
            .map_err(|e| e.to_string())?;
        Ok((http, cpu))
    }

    async fn detect_incident(&self, code: &str, sample: MetricSample) -> Result<(), String> {
        let resolved_code = {
            let guard = self.state.lock();
            if guard.scenario_by_code(code).is_some() {
                code.to_string()
            } else {
                guard
                    .scenarios
                    .first()
                    .map(|s| s.code.clone())
                    .unwrap_or_else(|| code.to_string())
            }
        };

        incident_pipeline::run_pipeline(
            &self.state,
            &self.knowledge,
            &self.report_generator,
            &self.chat,
            &resolved_code,
            sample,
        )
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
    }
}

/// The most recent sample in `window` that exceeded the metric relevant to
/// `code`, or the latest sample in the window if none did.
/// Order `codes` by descending delta (value - threshold) computed from the
/// window's latest sample, ties broken in favor of `HTTP_5XX_SURGE` — the
/// console's dual-breach tie-break rule, which also governs processing
/// order within a tick when both codes are newly breaching.
fn order_by_delta<'a>(codes: &[&'a str], window: &[MetricSample]) -> Vec<&'a str> {
    let latest = window.last().expect("window is full, at least one sample present");
    let delta_for = |code: &str| if code == HTTP_5XX_SURGE { latest.http_delta() } else { latest.cpu_delta() };
    let mut ordered = codes.to_vec();
    ordered.sort_by(|a, b| delta_for(b).partial_cmp(&delta_for(a)).unwrap_or(std::cmp::Ordering::Equal));
    ordered
}

fn representative_sample(window: &[MetricSample], code: &str) -> MetricSample {
    let predicate: fn(&MetricSample) -> bool = if code == HTTP_5XX_SURGE {
        MetricSample::http_exceeded
    } else {
        MetricSample::cpu_exceeded
    };
    window
        .iter()
        .rev()
        .find(|s| predicate(s))
        .or_else(|| window.last())
        .cloned()
        .expect("window is full, at least one sample present")
}

#[cfg(test)]
mod tests {
    use super::*;
    use incident_core::AppState;

    fn sample(http: f64, http_thr: f64, cpu: f64, cpu_thr: f64) -> MetricSample {
        MetricSample::new(http, http_thr, cpu, cpu_thr)
    }

    #[test]
    fn representative_sample_prefers_most_recent_breaching_sample() {
        let window = vec![
            sample(0.12, 0.05, 0.1, 0.8),
            sample(0.01, 0.05, 0.1, 0.8),
            sample(0.20, 0.05, 0.1, 0.8),
        ];
        let rep = representative_sample(&window, HTTP_5XX_SURGE);
        assert!((rep.http - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn representative_sample_falls_back_to_latest_when_no_breach() {
        let window = vec![sample(0.01, 0.05, 0.1, 0.8), sample(0.02, 0.05, 0.3, 0.8)];
        let rep = representative_sample(&window, HTTP_5XX_SURGE);
        assert!((rep.http - 0.02).abs() < f64::EPSILON);
    }

    #[test]
    fn order_by_delta_breaks_ties_in_favor_of_http() {
        let window = vec![sample(0.10, 0.05, 0.85, 0.80)];
        let ordered = order_by_delta(&[HTTP_5XX_SURGE, CPU_SPIKE_CORE], &window);
        assert_eq!(ordered, vec![HTTP_5XX_SURGE, CPU_SPIKE_CORE]);
    }

    #[test]
    fn order_by_delta_prefers_larger_non_tied_delta() {
        let window = vec![sample(0.07, 0.05, 0.95, 0.80)];
        let ordered = order_by_delta(&[HTTP_5XX_SURGE, CPU_SPIKE_CORE], &window);
        assert_eq!(ordered, vec![CPU_SPIKE_CORE, HTTP_5XX_SURGE]);
    }

    #[tokio::test]
    async fn tick_skips_silently_when_metrics_unconfigured() {
        let state = StateStore::new(AppState::default());
        let dir = tempfile::tempdir().unwrap();
        let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
        let monitor = Monitor::new(
            state.clone(),
            MetricsClient::new(),
            knowledge,
            ReportGenerator::new(None),
            ChatClient::new(),
        );
        monitor.tick().await.unwrap();
        assert!(state.snapshot().active_incidents.is_empty());
    }

    #[tokio::test]
    async fn window_not_yet_full_detects_nothing() {
        let state = StateStore::new(AppState::default());
        {
            let mut guard = state.lock();
            guard.metrics.url = "http://127.0.0.1:1".to_string();
            guard.metrics.http_query = "http_error_rate".to_string();
            guard.metrics.cpu_query = "cpu_usage".to_string();
            for _ in 0..(SAMPLE_WINDOW_CAPACITY - 1) {
                guard.monitor_samples.push(sample(0.01, 0.05, 0.1, 0.8));
            }
        }
        assert_eq!(state.lock().monitor_samples.len(), SAMPLE_WINDOW_CAPACITY - 1);
        assert!(!state.lock().monitor_samples.is_full());
    }
}
