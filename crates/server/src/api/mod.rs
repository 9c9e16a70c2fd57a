pub mod actions;
pub mod ai;
pub mod alerts;
pub mod chat;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod openapi;
pub mod rag;
pub mod schemas;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use incident_chat::ChatClient;
use incident_core::StateStore;
use incident_knowledge::KnowledgeStore;
use incident_metrics::MetricsClient;
use incident_notify::NotifySink;
use incident_report::ReportGenerator;
use incident_simulator::SimulatorClient;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::openapi::ApiDoc;

/// Shared application state passed to every handler. Cheap to clone: the
/// State Store is an `Arc<Mutex<_>>` handle already, and every other
/// collaborator is wrapped in its own `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub state: StateStore,
    pub knowledge: Arc<KnowledgeStore>,
    pub report_generator: Arc<ReportGenerator>,
    pub chat: Arc<ChatClient>,
    pub metrics: Arc<MetricsClient>,
    pub simulator: Arc<SimulatorClient>,
    pub notify: Option<Arc<NotifySink>>,
}

/// Build the Axum router: every endpoint in the console's HTTP surface,
/// CORS and request tracing layers, and Swagger UI.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/state", get(state::get_state))
        .route("/rag/documents", get(rag::list_documents))
        .route("/rag/upload", post(rag::upload_document))
        .route("/alerts/trigger", post(alerts::trigger))
        .route("/alerts/verify", post(alerts::verify))
        .route("/chat/test", post(chat::test))
        .route("/chat/save", post(chat::save))
        .route("/chat/dispatch", post(chat::dispatch))
        .route("/metrics/test", post(metrics::test))
        .route("/metrics/save", post(metrics::save))
        .route("/ai/save", post(ai::save))
        .route("/notifications/preferences", post(notifications::update_preferences))
        .route(
            "/notifications/emails",
            get(notifications::list_emails).post(notifications::add_email),
        )
        .route("/notifications/emails/{id}", delete(notifications::remove_email))
        .route("/notifications/pending/{id}/ack", post(notifications::acknowledge_pending))
        .route("/actions/{id}/execute", post(actions::execute))
        .route("/actions/{id}/defer", post(actions::defer));

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
