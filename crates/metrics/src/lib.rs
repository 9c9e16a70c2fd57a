//! Client for the metrics source the incident console polls.
//!
//! Speaks the Prometheus HTTP API's instant-query endpoint
//! (`GET /api/v1/query?query=...`) and nothing else — the console only ever
//! needs a single scalar sample per query string.

use std::time::Duration;

use incident_core::CoreError;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    value: (f64, String),
}

/// Synchronous (from the caller's perspective: one request, one response)
/// client for a Prometheus-compatible instant-query endpoint.
pub struct MetricsClient {
    client: Client,
}

impl MetricsClient {
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    /// Run an instant query and return its single scalar value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UpstreamError`] if the request fails, the
    /// endpoint reports a non-success status, the result set is empty, or
    /// the sample value does not parse as a float.
    pub async fn instant_value(&self, base_url: &str, query: &str) -> Result<f64, CoreError> {
        let endpoint = format!("{}/api/v1/query", base_url.trim_end_matches('/'));

        debug!(endpoint = %endpoint, query = %query, "querying metrics source");

        let response = self
            .client
            .get(&endpoint)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("metrics query failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::upstream(format!(
                "metrics source returned HTTP {status}: {body}"
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("metrics response was not valid JSON: {e}")))?;

        if parsed.status != "success" {
            let reason = parsed.error.unwrap_or_else(|| "unknown error".to_string());
            return Err(CoreError::upstream(format!(
                "metrics query unsuccessful: {reason}"
            )));
        }

        let result = parsed
            .data
            .map(|d| d.result)
            .unwrap_or_default();

        let first = result
            .first()
            .ok_or_else(|| CoreError::upstream("metrics query returned no samples"))?;

        first.value.1.parse::<f64>().map_err(|_| {
            warn!(raw = %first.value.1, "metrics sample was not numeric");
            CoreError::upstream("metrics sample missing numeric value")
        })
    }
}

impl Default for MetricsClient {
    fn default() -> Self {
        Self::new()
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
    async fn instant_value_parses_successful_sample() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"status":"success","data":{"result":[{"value":[1700000000,"0.073"]}]}}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, body).await });

        let client = MetricsClient::new();
        let value = client.instant_value(&base_url, "http_error_rate").await.unwrap();
        handle.await.unwrap();

        assert!((value - 0.073).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn instant_value_errors_on_empty_result() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"status":"success","data":{"result":[]}}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, body).await });

        let client = MetricsClient::new();
        let err = client.instant_value(&base_url, "cpu_usage").await.unwrap_err();
        handle.await.unwrap();

        assert!(matches!(err, CoreError::UpstreamError(_)));
    }

    #[tokio::test]
    async fn instant_value_errors_on_query_failure_status() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"status":"error","error":"bad query syntax"}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, body).await });

        let client = MetricsClient::new();
        let err = client.instant_value(&base_url, "not a promql").await.unwrap_err();
        handle.await.unwrap();

        match err {
            CoreError::UpstreamError(msg) => assert!(msg.contains("bad query syntax")),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
