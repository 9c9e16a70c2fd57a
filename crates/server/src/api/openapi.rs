use super::schemas::{
    AcknowledgeResponse, ActionExecutionResponse, AddEmailRequest, AiSettingsRequest,
    AlertTriggerResponse, AlertVerifyResponse, ChatDispatchRequest, ChatIdentityResponse,
    ChatReceiptResponse, ChatSettingsRequest, DocumentsResponse, EmailListResponse, ErrorResponse,
    HealthResponse, MessageResponse, MetricsTestRequest, MetricsTestResponse,
    NotificationPreferencesRequest, RecipientResponse, RemovedResponse, UploadResponse,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Incident Response Console API",
        version = "0.1.0",
        description = "HTTP API for the incident response console backend. Configure the metrics and chat \
                       sources, review state, approve or defer action plans, and manage the knowledge base.",
        license(name = "MIT")
    ),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "State", description = "Point-in-time state snapshots"),
        (name = "Knowledge", description = "RAG-style knowledge base"),
        (name = "Alerts", description = "Manual alert trigger and verification"),
        (name = "Chat", description = "Chat platform integration"),
        (name = "Metrics", description = "Metrics source configuration"),
        (name = "AI", description = "LLM provider configuration"),
        (name = "Notifications", description = "Notification preferences and recipients"),
        (name = "Actions", description = "Action execution lifecycle"),
    ),
    paths(
        super::health::health,
        super::state::get_state,
        super::rag::list_documents,
        super::rag::upload_document,
        super::alerts::trigger,
        super::alerts::verify,
        super::chat::test,
        super::chat::save,
        super::chat::dispatch,
        super::metrics::test,
        super::metrics::save,
        super::ai::save,
        super::notifications::update_preferences,
        super::notifications::list_emails,
        super::notifications::add_email,
        super::notifications::remove_email,
        super::notifications::acknowledge_pending,
        super::actions::execute,
        super::actions::defer,
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        incident_core::StateSnapshot,
        incident_core::MetricsSettings,
        incident_core::ChatSettings,
        incident_core::AiSettings,
        incident_core::NotificationPreferences,
        incident_core::AlertScenario,
        incident_core::IncidentReport,
        incident_core::ActionExecution,
        incident_core::ActionExecutionResult,
        incident_core::ActionStatus,
        incident_core::RecoveryCheck,
        incident_core::RecoveryStatus,
        incident_core::EmailRecipient,
        incident_core::KnowledgeDocument,
        incident_core::DocumentMetadata,
        incident_core::DocumentType,
        incident_core::DocumentStatus,
        incident_core::RecoveryState,
        incident_core::MetricSample,
        DocumentsResponse,
        UploadResponse,
        AlertTriggerResponse,
        AlertVerifyResponse,
        ChatSettingsRequest,
        ChatIdentityResponse,
        ChatDispatchRequest,
        ChatReceiptResponse,
        MetricsTestRequest,
        MetricsTestResponse,
        AiSettingsRequest,
        MessageResponse,
        NotificationPreferencesRequest,
        EmailListResponse,
        AddEmailRequest,
        RecipientResponse,
        RemovedResponse,
        AcknowledgeResponse,
        ActionExecutionResponse,
    ))
)]
pub struct ApiDoc;
