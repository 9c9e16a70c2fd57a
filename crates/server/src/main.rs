use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use incident_chat::ChatClient;
use incident_core::{AppState, StateStore};
use incident_knowledge::KnowledgeStore;
use incident_metrics::MetricsClient;
use incident_monitor::Monitor;
use incident_notify::NotifySink;
use incident_report::ReportGenerator;
use incident_server::config::IncidentConfig;
use incident_simulator::SimulatorClient;
use tracing::info;

/// Incident response console backend.
#[derive(Parser, Debug)]
#[command(name = "incident-server", about = "Standalone HTTP server for the incident response console backend")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "incident.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("INCIDENT_BACKEND_LOG_LEVEL")
                .ok()
                .map_or_else(|| tracing_subscriber::EnvFilter::new("info"), tracing_subscriber::EnvFilter::new),
        )
        .init();

    let cli = Cli::parse();

    let config: IncidentConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        toml::from_str("")?
    };

    let state = StateStore::new(AppState::default());
    let knowledge = KnowledgeStore::open(&config.knowledge.data_dir).await?;
    knowledge.bootstrap(&state.lock().scenarios.clone()).await;

    let simulator = Arc::new(SimulatorClient::new(config.simulator.url.clone()));
    let notify = NotifySink::from_env().map(Arc::new);
    if notify.is_some() {
        info!("email notifications enabled");
    } else {
        info!("INCIDENT_EMAIL_SMTP_HOST not set, email notifications disabled");
    }

    incident_simulator::host::ensure_started(&config.simulator.bind, &config.simulator.url)
        .await
        .map_err(|e| format!("failed to start action simulator: {e}"))?;

    // The metrics/chat/report-generator clients are stateless, so the
    // monitor and the HTTP layer each get their own instance; the
    // knowledge store is cloned (Arc-backed internally) so both sides
    // read and write the same persisted documents.
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let monitor = Monitor::new(
        state.clone(),
        MetricsClient::new(),
        knowledge.clone(),
        ReportGenerator::new(None),
        ChatClient::new(),
    );
    let monitor_handle = tokio::spawn(async move {
        monitor.run(stop_rx).await;
    });

    let app_state = incident_server::api::AppState {
        state: state.clone(),
        knowledge: Arc::new(knowledge),
        report_generator: Arc::new(ReportGenerator::new(None)),
        chat: Arc::new(ChatClient::new()),
        metrics: Arc::new(MetricsClient::new()),
        simulator,
        notify,
    };
    let app = incident_server::api::router(app_state);

    let host = cli
        .host
        .or_else(|| std::env::var("INCIDENT_BACKEND_HOST").ok())
        .unwrap_or(config.server.host);
    let port = cli
        .port
        .or_else(|| std::env::var("INCIDENT_BACKEND_PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "incident-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_tx.send(true);
    if tokio::time::timeout(Duration::from_secs(2), monitor_handle).await.is_err() {
        tracing::warn!("sampling monitor did not stop within the shutdown timeout");
    }

    info!("incident-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
