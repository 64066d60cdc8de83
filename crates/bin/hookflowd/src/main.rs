//! # hookflowd — hookflow daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository, recorder and HTTP client implementations (adapters)
//! - Construct the execution engine and application services, injecting
//!   adapters via port traits
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT): stop accepting requests,
//!   cancel in-flight executions and give them a moment to record themselves
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use hookflow_adapter_http_axum::state::{AppState, Engine};
use hookflow_adapter_http_reqwest::ReqwestHttpClient;
use hookflow_adapter_storage_sqlite_sqlx::{
    SqliteAutomationRepository, SqliteExecutionRecorder, SqliteWebhookRepository,
};
use hookflow_app::event_bus::InProcessEventBus;
use hookflow_app::execution_engine::ExecutionEngine;
use hookflow_app::services::automation_service::AutomationService;
use hookflow_app::services::execution_service::ExecutionService;
use hookflow_app::services::webhook_service::WebhookService;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

type DaemonEngine = Engine<
    SqliteAutomationRepository,
    SqliteWebhookRepository,
    SqliteExecutionRecorder,
    Arc<ReqwestHttpClient>,
>;

const EVENT_BUS_CAPACITY: usize = 256;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let (app, engine) = build_app(&config).await?;

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "hookflowd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel_executions_on(shutdown_signal(), engine.clone()))
        .await?;

    drain(&engine).await;
    tracing::info!("hookflowd stopped");

    Ok(())
}

/// Wire storage, HTTP client, engine and services into the API router.
async fn build_app(
    config: &Config,
) -> Result<(axum::Router, DaemonEngine), Box<dyn std::error::Error>> {
    // Database
    let db = config.storage().build().await?;
    let pool = db.pool().clone();

    // Adapters
    let automation_repo = SqliteAutomationRepository::new(pool.clone());
    let webhook_repo = SqliteWebhookRepository::new(pool.clone());
    let recorder = SqliteExecutionRecorder::new(pool);
    let http_client = Arc::new(config.http_client().build()?);

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(EVENT_BUS_CAPACITY));

    // Engine and services
    let engine: DaemonEngine = ExecutionEngine::new(
        automation_repo.clone(),
        webhook_repo.clone(),
        recorder.clone(),
        Arc::clone(&http_client),
        Arc::clone(&event_bus),
    );
    let automation_service = AutomationService::new(automation_repo);
    let webhook_service = WebhookService::new(webhook_repo, http_client);
    let execution_service = ExecutionService::new(recorder);

    // HTTP
    let state = AppState::new(
        automation_service,
        webhook_service,
        execution_service,
        engine.clone(),
        event_bus,
    );
    Ok((hookflow_adapter_http_axum::router::build(state), engine))
}

/// Cancel every in-flight execution once `signal` fires.
///
/// Handlers awaiting a run only return after it stopped, and the graceful
/// shutdown of the server waits for those handlers.
async fn cancel_executions_on(signal: impl Future<Output = ()>, engine: DaemonEngine) {
    signal.await;
    engine.shutdown();
}

/// Resolve on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}

/// Wait for cancelled executions to record their final status.
async fn drain(engine: &DaemonEngine) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    loop {
        let running = engine.running().len();
        if running == 0 {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(running, "executions still running at exit");
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
