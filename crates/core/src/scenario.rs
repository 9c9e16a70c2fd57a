use serde::{Deserialize, Serialize};

/// An immutable reference alert scenario seeded at startup. The scenario
/// `code` is the stable identifier used as the cause code throughout the
/// rest of the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AlertScenario {
    pub code: String,
    pub title: String,
    pub source: String,
    pub description: String,
    pub hypotheses: Vec<String>,
    pub evidences: Vec<String>,
    pub actions: Vec<String>,
}

pub const HTTP_5XX_SURGE: &str = "http_5xx_surge";
pub const CPU_SPIKE_CORE: &str = "cpu_spike_core";

/// The two scenarios seeded at startup, matching the console's default
/// playbook.
#[must_use]
pub fn default_scenarios() -> Vec<AlertScenario> {
    vec![
        AlertScenario {
            code: HTTP_5XX_SURGE.to_string(),
            title: "Nginx 5xx surge on checkout API".to_string(),
            source: "metrics http_error_rate".to_string(),
            description: "http_error_rate exceeded threshold triggering a chat notification"
                .to_string(),
            hypotheses: vec![
                "Recent deploy introduced a regression in request validation".to_string(),
                "Upstream payment provider timeout cascading to the gateway".to_string(),
                "Auto-scaling group missing warm instances causing cold-start failures"
                    .to_string(),
            ],
            evidences: vec![
                "http_error_rate > 12% over 5m".to_string(),
                "Deployment rolled out 5 minutes before the alert".to_string(),
                "Gateway pods restarted 3 times within 10m".to_string(),
            ],
            actions: vec![
                "Roll back checkout-service to the previous build".to_string(),
                "Scale gateway pool to 2x to absorb the traffic spike".to_string(),
                "Notify the product manager in the incident channel".to_string(),
            ],
        },
        AlertScenario {
            code: CPU_SPIKE_CORE.to_string(),
            title: "Edge node CPU spike".to_string(),
            source: "metrics cpu_usage".to_string(),
            description: "cpu_usage exceeded 90% sustained over the sampling window".to_string(),
            hypotheses: vec![
                "Edge node receiving a concentrated traffic burst".to_string(),
                "A new scrape job is running hot due to a misconfigured interval".to_string(),
                "Background batch job pinned to a shared core".to_string(),
            ],
            evidences: vec![
                "cpu_usage >= 92% for 10 minutes on the affected node".to_string(),
                "Load balancer sticky sessions skewed toward the node".to_string(),
                "No matching deployment in the change log".to_string(),
            ],
            actions: vec![
                "Rebalance traffic by updating load balancer weights".to_string(),
                "Throttle the scrape interval for the experimental dashboard".to_string(),
                "Open an outage ticket for visibility".to_string(),
            ],
        },
    ]
}
