//! Client for the chat platform the incident console notifies through.
//!
//! Speaks a Slack-shaped Web API: bearer token auth, `auth.test` for
//! connectivity checks, `chat.postMessage` for delivery.

use std::time::Duration;

use incident_core::CoreError;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    team_id: Option<String>,
}

/// The identity a `test` call confirms against the chat platform.
#[derive(Debug, Clone)]
pub struct ChatIdentity {
    pub user_id: Option<String>,
    pub team_id: Option<String>,
}

/// The delivery receipt a successful `post` call returns.
#[derive(Debug, Clone)]
pub struct ChatReceipt {
    pub channel: Option<String>,
    pub ts: Option<String>,
}

pub struct ChatClient {
    client: Client,
    api_base_url: String,
}

impl ChatClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url("https://slack.com/api")
    }

    #[must_use]
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            api_base_url: api_base_url.into(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base_url)
    }

    /// Confirm the token is valid and return the authenticated identity.
    pub async fn test(&self, token: &str) -> Result<ChatIdentity, CoreError> {
        let response = self
            .client
            .post(self.api_url("auth.test"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("chat platform connection failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::upstream(format!(
                "chat platform returned HTTP {status}: {body}"
            )));
        }

        let parsed: AuthTestResponse = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("chat platform response was not valid JSON: {e}")))?;

        if !parsed.ok {
            let reason = parsed.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(CoreError::upstream(format!("chat auth.test failed: {reason}")));
        }

        Ok(ChatIdentity {
            user_id: parsed.user_id,
            team_id: parsed.team_id,
        })
    }

    /// Post a message to a channel.
    pub async fn post(&self, token: &str, channel: &str, text: &str) -> Result<ChatReceipt, CoreError> {
        debug!(channel = %channel, "posting message to chat platform");

        let response = self
            .client
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "channel": channel, "text": text }))
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("chat platform connection failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::upstream(format!(
                "chat platform returned HTTP {status}: {body}"
            )));
        }

        let parsed: ChatApiResponse = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("chat platform response was not valid JSON: {e}")))?;

        if !parsed.ok {
            let reason = parsed.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(CoreError::upstream(format!("chat.postMessage failed: {reason}")));
        }

        Ok(ChatReceipt {
            channel: parsed.channel,
            ts: parsed.ts,
        })
    }
}

impl Default for ChatClient {
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

        async fn respond_once(self, body: &str) {
            let body = body.to_string();
            let (mut stream, _) = self.listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_returns_identity_on_success() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"ok":true,"user_id":"U1","team_id":"T1"}"#;
        let handle = tokio::spawn(async move { server.respond_once(body).await });

        let client = ChatClient::with_base_url(base_url);
        let identity = client.test("xoxb-token").await.unwrap();
        handle.await.unwrap();

        assert_eq!(identity.user_id.as_deref(), Some("U1"));
    }

    #[tokio::test]
    async fn test_errors_on_invalid_auth() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"ok":false,"error":"invalid_auth"}"#;
        let handle = tokio::spawn(async move { server.respond_once(body).await });

        let client = ChatClient::with_base_url(base_url);
        let err = client.test("bad-token").await.unwrap_err();
        handle.await.unwrap();

        match err {
            CoreError::UpstreamError(msg) => assert!(msg.contains("invalid_auth")),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_returns_receipt_on_success() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"ok":true,"channel":"C1","ts":"123.456"}"#;
        let handle = tokio::spawn(async move { server.respond_once(body).await });

        let client = ChatClient::with_base_url(base_url);
        let receipt = client.post("xoxb-token", "#incidents", "hello").await.unwrap();
        handle.await.unwrap();

        assert_eq!(receipt.channel.as_deref(), Some("C1"));
    }

    #[tokio::test]
    async fn post_errors_propagate_platform_reason() {
        let server = MockServer::start().await;
        let base_url = server.base_url.clone();
        let body = r#"{"ok":false,"error":"channel_not_found"}"#;
        let handle = tokio::spawn(async move { server.respond_once(body).await });

        let client = ChatClient::with_base_url(base_url);
        let err = client.post("xoxb-token", "#nope", "hi").await.unwrap_err();
        handle.await.unwrap();

        match err {
            CoreError::UpstreamError(msg) => assert!(msg.contains("channel_not_found")),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
