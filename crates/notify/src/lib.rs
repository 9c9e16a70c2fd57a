//! SMTP notification sink.
//!
//! On every action-status transition the pipeline composes a plaintext
//! message and iterates the recipient registry, delivering through an SMTP
//! relay configured from environment variables. A missing host silently
//! skips delivery; every other failure is logged and never propagated to
//! the caller — this sink is best-effort by design (spec §4.K).

use std::env;

use chrono::{DateTime, Utc};
use incident_core::{ActionExecution, EmailRecipient};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, instrument, warn};

/// SMTP relay configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
    pub from_address: String,
}

impl SmtpConfig {
    /// Read `INCIDENT_EMAIL_SMTP_{HOST,PORT,USER,PASSWORD,TLS,FROM}` from
    /// the environment. Returns `None` if `HOST` is unset or empty — the
    /// console runs with notifications disabled in that case, not an error.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let host = env::var("INCIDENT_EMAIL_SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        let port = env::var("INCIDENT_EMAIL_SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);
        let username = env::var("INCIDENT_EMAIL_SMTP_USER").ok().filter(|u| !u.is_empty());
        let password = env::var("INCIDENT_EMAIL_SMTP_PASSWORD").ok().filter(|p| !p.is_empty());
        let tls = env::var("INCIDENT_EMAIL_SMTP_TLS")
            .ok()
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);
        let from_address = env::var("INCIDENT_EMAIL_SMTP_FROM")
            .ok()
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| "incident-console@localhost".to_string());

        Some(Self {
            host,
            port,
            username,
            password,
            tls,
            from_address,
        })
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
        let builder = if self.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| format!("SMTP TLS relay error: {e}"))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
        };
        let builder = builder.port(self.port);
        let builder = if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            builder.credentials(Credentials::new(user.clone(), pass.clone()))
        } else {
            builder
        };
        Ok(builder.build())
    }
}

/// Sends action-status notification emails. Holds no state beyond its
/// configuration; constructed once and shared behind a clone-cheap handle
/// by callers that need it (the pipeline holds an `Option<NotifySink>`).
#[derive(Clone)]
pub struct NotifySink {
    config: SmtpConfig,
}

impl NotifySink {
    /// Build a sink from environment-derived configuration. Returns `None`
    /// if no SMTP host is configured — callers should treat a `None` sink
    /// as "notifications disabled" rather than an error.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        SmtpConfig::from_env().map(|config| Self { config })
    }

    /// Notify every recipient in `recipients` of an action-status
    /// transition on `execution`. Every per-recipient failure is logged and
    /// swallowed; this never returns an error to the caller.
    #[instrument(skip(self, recipients, execution), fields(execution_id = %execution.id, recipients = recipients.len()))]
    pub async fn notify_status_change(&self, recipients: &[EmailRecipient], execution: &ActionExecution) {
        if recipients.is_empty() {
            debug!("no recipients registered, skipping notification");
            return;
        }

        let transport = match self.config.build_transport() {
            Ok(t) => t,
            Err(err) => {
                warn!(error = %err, "failed to build SMTP transport, skipping notification");
                return;
            }
        };

        let subject = format!(
            "[Incident Console] {} — {}",
            execution.scenario_title,
            status_label(execution)
        );
        let body = render_body(execution);

        for recipient in recipients {
            match send_one(&transport, &self.config.from_address, &recipient.email, &subject, &body).await {
                Ok(()) => info!(to = %recipient.email, "notification delivered"),
                Err(err) => warn!(to = %recipient.email, error = %err, "notification delivery failed"),
            }
        }
    }
}

async fn send_one(
    transport: &AsyncSmtpTransport<Tokio1Executor>,
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<(), String> {
    let from_mailbox: Mailbox = from.parse().map_err(|e| format!("invalid from address: {e}"))?;
    let to_mailbox: Mailbox = to.parse().map_err(|e| format!("invalid recipient address: {e}"))?;

    let message = Message::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| format!("failed to build message: {e}"))?;

    transport
        .send(message)
        .await
        .map(|_| ())
        .map_err(|e| format!("SMTP send failed: {e}"))
}

fn status_label(execution: &ActionExecution) -> &'static str {
    match execution.status {
        incident_core::ActionStatus::Pending => "pending",
        incident_core::ActionStatus::Executed => "executed",
        incident_core::ActionStatus::Deferred => "deferred",
    }
}

fn render_body(execution: &ActionExecution) -> String {
    let mut lines = vec![
        format!("Scenario: {}", execution.scenario_title),
        format!("Status: {}", status_label(execution)),
        format!("Queued at: {}", format_timestamp(execution.created_at)),
    ];
    if let Some(executed_at) = execution.executed_at {
        lines.push(format!("Executed at: {}", format_timestamp(executed_at)));
    }
    lines.push("Actions:".to_string());
    for action in &execution.actions {
        lines.push(format!("  - {action}"));
    }
    if !execution.results.is_empty() {
        lines.push("Results:".to_string());
        for result in &execution.results {
            lines.push(format!(
                "  - {}: {} ({})",
                result.action, result.status, result.detail
            ));
        }
    }
    lines.join("\n")
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use incident_core::{ActionStatus, ActionExecutionResult};
    use uuid::Uuid;

    fn execution(status: ActionStatus) -> ActionExecution {
        ActionExecution {
            id: Uuid::new_v4(),
            report_id: Uuid::new_v4(),
            scenario_code: "http_5xx_surge".to_string(),
            scenario_title: "Nginx 5xx surge".to_string(),
            created_at: Utc::now(),
            actions: vec!["roll back checkout-service".to_string()],
            status,
            executed_at: if status == ActionStatus::Executed {
                Some(Utc::now())
            } else {
                None
            },
            results: if status == ActionStatus::Executed {
                vec![ActionExecutionResult {
                    action: "roll back checkout-service".to_string(),
                    status: "ok".to_string(),
                    detail: "rolled back".to_string(),
                    executed_at: Utc::now(),
                }]
            } else {
                Vec::new()
            },
        }
    }

    #[test]
    fn smtp_config_from_env_requires_host() {
        env::remove_var("INCIDENT_EMAIL_SMTP_HOST");
        assert!(SmtpConfig::from_env().is_none());
    }

    #[test]
    fn render_body_includes_actions_and_results() {
        let body = render_body(&execution(ActionStatus::Executed));
        assert!(body.contains("Nginx 5xx surge"));
        assert!(body.contains("executed"));
        assert!(body.contains("roll back checkout-service"));
        assert!(body.contains("ok"));
    }

    #[test]
    fn render_body_pending_has_no_results_section() {
        let body = render_body(&execution(ActionStatus::Pending));
        assert!(!body.contains("Results:"));
    }

    #[tokio::test]
    async fn notify_with_no_recipients_is_a_noop() {
        let config = SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: None,
            password: None,
            tls: false,
            from_address: "noreply@localhost".to_string(),
        };
        let sink = NotifySink { config };
        sink.notify_status_change(&[], &execution(ActionStatus::Executed)).await;
    }

    #[test]
    fn build_transport_without_tls_succeeds() {
        let config = SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: None,
            password: None,
            tls: false,
            from_address: "noreply@localhost".to_string(),
        };
        assert!(config.build_transport().is_ok());
    }
}
