use std::time::Duration;

use axum::{routing::{get, post}, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::SimulatorClient;

#[derive(Debug, Deserialize)]
struct ExecutePayload {
    execution_id: Uuid,
    action: String,
}

#[derive(Debug, Serialize)]
struct ExecuteResponse {
    execution_id: Uuid,
    status: &'static str,
    detail: String,
    executed_at: chrono::DateTime<Utc>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn execute(Json(payload): Json<ExecutePayload>) -> Json<ExecuteResponse> {
    Json(ExecuteResponse {
        execution_id: payload.execution_id,
        status: "success",
        detail: format!("Simulated run completed for '{}'.", payload.action),
        executed_at: Utc::now(),
    })
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/execute", post(execute))
}

static SIMULATOR_STARTED: OnceCell<()> = OnceCell::const_new();

/// Probe for an already-running simulator, then spawn one in-process if
/// none answers, and block until `/health` reports success or the retry
/// budget (20 attempts, 0.25s apart, 0.5s per probe) is exhausted.
///
/// Safe to call more than once — concurrent callers converge on the same
/// `OnceCell`, so exactly one bind attempt happens regardless of how many
/// tasks race to start the simulator.
///
/// # Errors
///
/// Returns an error if the simulator never reports healthy within the
/// retry budget.
pub async fn ensure_started(bind_addr: &str, reachable_base_url: &str) -> Result<(), String> {
    let bind_addr = bind_addr.to_string();
    let reachable_base_url = reachable_base_url.to_string();

    SIMULATOR_STARTED
        .get_or_try_init(|| async {
            let probe_client = SimulatorClient::new(reachable_base_url.clone());
            if probe_client.probe_health(Duration::from_millis(500)).await {
                info!("action simulator already running, reusing it");
                return Ok::<(), String>(());
            }

            let listener = TcpListener::bind(&bind_addr)
                .await
                .map_err(|e| format!("failed to bind action simulator on {bind_addr}: {e}"))?;

            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router()).await {
                    warn!(error = %e, "action simulator server exited");
                }
            });

            wait_until_healthy(&reachable_base_url).await
        })
        .await
        .map(|_| ())
}

async fn wait_until_healthy(base_url: &str) -> Result<(), String> {
    let client = SimulatorClient::new(base_url.to_string());
    for _ in 0..20 {
        if client.probe_health(Duration::from_millis(500)).await {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    Err("action simulator did not become healthy in time".to_string())
}
