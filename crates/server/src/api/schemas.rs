//! Shared request/response DTOs for the incident console HTTP API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `GET /health` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Uniform error body returned for every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// `POST /chat/test` / `POST /chat/save` request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatSettingsRequest {
    pub token: String,
    pub channel: String,
    #[serde(default)]
    pub workspace: String,
}

/// `POST /chat/test` response: the platform identity the token resolved to.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatIdentityResponse {
    pub user_id: Option<String>,
    pub team_id: Option<String>,
}

/// `POST /chat/dispatch` request body. `channel` overrides the saved
/// channel for this single dispatch only.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatDispatchRequest {
    #[serde(default)]
    pub channel: Option<String>,
}

/// `POST /chat/dispatch` response: the platform delivery receipt.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatReceiptResponse {
    pub channel: Option<String>,
    pub ts: Option<String>,
}

/// `POST /metrics/test` request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MetricsTestRequest {
    pub url: String,
    pub http_query: String,
    pub cpu_query: String,
}

/// `POST /metrics/test` response: the two instantaneous samples fetched.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetricsTestResponse {
    pub http: f64,
    pub cpu: f64,
}

/// `POST /ai/save` request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AiSettingsRequest {
    pub api_key: String,
}

/// A plain acknowledgement message, used by every `*/save` endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// `POST /notifications/preferences` request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NotificationPreferencesRequest {
    pub chat: bool,
}

/// `GET /notifications/emails` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmailListResponse {
    pub emails: Vec<incident_core::EmailRecipient>,
}

/// `POST /notifications/emails` request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddEmailRequest {
    pub email: String,
}

/// `POST /notifications/emails` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipientResponse {
    pub recipient: incident_core::EmailRecipient,
}

/// `DELETE /notifications/emails/{id}` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RemovedResponse {
    pub removed: uuid::Uuid,
}

/// `POST /notifications/pending/{id}/ack` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcknowledgeResponse {
    pub status: &'static str,
    pub report_id: uuid::Uuid,
}

/// `POST /alerts/trigger` response: a manually fired alert, shaped the way
/// the front-end's alert banner expects — scenario narrative fields plus
/// the feed line that was appended and whether `/alerts/verify` can now be
/// polled for this alert.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlertTriggerResponse {
    pub scenario: incident_core::AlertScenario,
    pub hypotheses: Vec<String>,
    pub evidence: Vec<String>,
    pub actions: Vec<String>,
    pub feed_line: String,
    pub verify_enabled: bool,
}

/// `POST /alerts/verify` response: a single point-in-time read of the
/// metrics source, independent of the Monitor's windowed evaluation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlertVerifyResponse {
    pub http: f64,
    pub cpu: f64,
    pub http_threshold: f64,
    pub cpu_threshold: f64,
    pub status: &'static str,
}

/// `GET /rag/documents` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentsResponse {
    pub documents: Vec<incident_core::KnowledgeDocument>,
}

/// `POST /rag/upload` response: the generated `doc_key` for every document
/// the upload produced.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub documents: Vec<String>,
}

/// `POST /actions/{id}/execute` and `POST /actions/{id}/defer` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionExecutionResponse {
    pub execution: incident_core::ActionExecution,
}
