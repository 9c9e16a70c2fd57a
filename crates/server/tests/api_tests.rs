use std::sync::Arc;

use axum_test::TestServer;
use incident_chat::ChatClient;
use incident_core::{AppState, StateStore};
use incident_knowledge::KnowledgeStore;
use incident_metrics::MetricsClient;
use incident_report::ReportGenerator;
use incident_server::api::{self, AppState as ServerAppState};
use incident_simulator::SimulatorClient;

async fn build_state() -> (ServerAppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let knowledge = KnowledgeStore::open(dir.path()).await.unwrap();
    let state = StateStore::new(AppState::default());
    knowledge.bootstrap(&state.lock().scenarios.clone()).await;

    let server_state = ServerAppState {
        state,
        knowledge: Arc::new(knowledge),
        report_generator: Arc::new(ReportGenerator::new(None)),
        chat: Arc::new(ChatClient::new()),
        metrics: Arc::new(MetricsClient::new()),
        simulator: Arc::new(SimulatorClient::new("http://127.0.0.1:1")),
        notify: None,
    };
    (server_state, dir)
}

#[tokio::test]
async fn health_reports_ok() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();
    let response = server.get("/health").await;
    response.assert_json(&serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn state_snapshot_includes_seeded_scenarios() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();
    let response = server.get("/state").await;
    let body: serde_json::Value = response.json();
    assert!(body["scenarios"].as_array().unwrap().len() >= 1);
}

#[tokio::test]
async fn rag_upload_txt_then_list_round_trips() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();

    let form = axum_test::multipart::MultipartForm::new().add_part(
        "file",
        axum_test::multipart::Part::text("root cause: disk full")
            .file_name("postmortem.txt")
            .mime_type("text/plain"),
    );
    let response = server.post("/rag/upload").multipart(form).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);

    let list = server.get("/rag/documents").await;
    let list_body: serde_json::Value = list.json();
    let documents = list_body["documents"].as_array().unwrap();
    assert!(documents.iter().any(|d| d["content"] == "root cause: disk full"));
}

#[tokio::test]
async fn rag_upload_rejects_empty_body() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();

    let form = axum_test::multipart::MultipartForm::new().add_part(
        "file",
        axum_test::multipart::Part::bytes(Vec::new()).file_name("empty.txt").mime_type("text/plain"),
    );
    let response = server.post("/rag/upload").multipart(form).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn alerts_trigger_records_feed_line_and_history() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();

    let response = server.post("/alerts/trigger").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["verify_enabled"], true);

    let snapshot = server.get("/state").await;
    let snapshot_body: serde_json::Value = snapshot.json();
    assert!(!snapshot_body["alert_history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn notifications_email_lifecycle() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();

    let add = server
        .post("/notifications/emails")
        .json(&serde_json::json!({ "email": "oncall@example.com" }))
        .await;
    add.assert_status_ok();
    let recipient: serde_json::Value = add.json();
    let id = recipient["recipient"]["id"].as_str().unwrap().to_string();

    let list = server.get("/notifications/emails").await;
    let list_body: serde_json::Value = list.json();
    assert_eq!(list_body["emails"].as_array().unwrap().len(), 1);

    let remove = server.delete(&format!("/notifications/emails/{id}")).await;
    remove.assert_status_ok();

    let missing = server.delete(&format!("/notifications/emails/{id}")).await;
    missing.assert_status_not_found();
}

#[tokio::test]
async fn adding_same_email_twice_does_not_duplicate() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();

    let first = server
        .post("/notifications/emails")
        .json(&serde_json::json!({ "email": "Oncall@Example.com" }))
        .await;
    first.assert_status_ok();
    let first_id = first.json::<serde_json::Value>()["recipient"]["id"].as_str().unwrap().to_string();

    let second = server
        .post("/notifications/emails")
        .json(&serde_json::json!({ "email": " oncall@example.com " }))
        .await;
    second.assert_status_ok();
    let second_id = second.json::<serde_json::Value>()["recipient"]["id"].as_str().unwrap().to_string();

    assert_eq!(first_id, second_id);

    let list = server.get("/notifications/emails").await;
    let list_body: serde_json::Value = list.json();
    assert_eq!(list_body["emails"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn actions_defer_unknown_id_is_bad_request() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();

    let response = server.post(&format!("/actions/{}/defer", uuid::Uuid::new_v4())).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn metrics_save_updates_state_snapshot() {
    let (state, _dir) = build_state().await;
    let server = TestServer::new(api::router(state)).unwrap();

    let response = server
        .post("/metrics/save")
        .json(&serde_json::json!({
            "url": "http://prometheus.local",
            "http_query": "http_error_rate",
            "cpu_query": "cpu_usage",
            "http_threshold": 0.05,
            "cpu_threshold": 0.8
        }))
        .await;
    response.assert_status_ok();

    let snapshot = server.get("/state").await;
    let snapshot_body: serde_json::Value = snapshot.json();
    assert_eq!(snapshot_body["metrics"]["url"], "http://prometheus.local");
}
