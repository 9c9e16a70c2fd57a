use std::time::Duration;

use chrono::{DateTime, Utc};
use incident_core::CoreError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

const EXECUTE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct ExecuteRequest {
    execution_id: Uuid,
    action: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    status: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    executed_at: Option<DateTime<Utc>>,
}

/// The outcome of dispatching one action string to the simulator.
#[derive(Debug, Clone)]
pub struct SimulatedOutcome {
    pub status: String,
    pub detail: String,
    pub executed_at: DateTime<Utc>,
}

/// HTTP client for the action simulator. One request per action string; the
/// caller is responsible for aborting the whole plan on the first failure.
pub struct SimulatorClient {
    client: Client,
    base_url: String,
}

impl SimulatorClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(EXECUTE_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Dispatch one action. HTTP status >= 400, or a transport failure, is a
    /// hard failure carried back as [`CoreError::BadRequest`] — per the
    /// console's rule that a simulator failure aborts the whole plan and
    /// leaves it pending rather than surfacing as an upstream outage.
    pub async fn execute(&self, execution_id: Uuid, action: &str) -> Result<SimulatedOutcome, CoreError> {
        debug!(%execution_id, action = %action, "dispatching action to simulator");

        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(&ExecuteRequest {
                execution_id,
                action: action.to_string(),
            })
            .send()
            .await
            .map_err(|e| CoreError::bad_request(format!("action simulator request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(CoreError::bad_request(format!(
                "action simulator failed with HTTP {status}"
            )));
        }

        let parsed: ExecuteResponse = response
            .json()
            .await
            .map_err(|e| CoreError::bad_request(format!("action simulator response was not valid JSON: {e}")))?;

        Ok(SimulatedOutcome {
            status: parsed.status,
            detail: parsed.detail,
            executed_at: parsed.executed_at.unwrap_or_else(Utc::now),
        })
    }

    /// Probe `/health`, used by the start-once bootstrap to detect an
    /// already-running simulator before spawning a new one.
    pub async fn probe_health(&self, timeout: Duration) -> bool {
        let client = match Client::builder().timeout(timeout).build() {
            Ok(c) => c,
            Err(_) => return false,
        };
        matches!(
            client.get(format!("{}/health", self.base_url)).send().await,
            Ok(resp) if resp.status().is_success()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct MockServer {
        listener: TcpListener,
        base_url: String,
    }

    impl MockServer {
        async fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            Self {
                listener,
                base_url: format!("http://127.0.0.1:{port}"),
            }
        }

        async fn respond_once(self, status_code: u16, body: &str) {
            let body = body.to_string();
            let (mut stream, _) = self.listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status_code} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    }

    #[tokio::test]
    async fn execute_returns_outcome_on_success() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"status":"success","detail":"ran it","executed_at":"2026-01-01T00:00:00Z"}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, body).await });

        let client = SimulatorClient::new(base_url);
        let outcome = client.execute(Uuid::new_v4(), "roll back").await.unwrap();
        handle.await.unwrap();

        assert_eq!(outcome.status, "success");
        assert_eq!(outcome.detail, "ran it");
    }

    #[tokio::test]
    async fn execute_errors_on_http_failure_status() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"detail":"boom"}"#;
        let handle = tokio::spawn(async move { server.respond_once(500, body).await });

        let client = SimulatorClient::new(base_url);
        let err = client.execute(Uuid::new_v4(), "roll back").await.unwrap_err();
        handle.await.unwrap();

        assert!(matches!(err, CoreError::BadRequest(_)));
    }
}
