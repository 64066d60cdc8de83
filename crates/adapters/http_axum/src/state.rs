//! Shared application state for axum handlers.

use std::sync::Arc;

use hookflow_app::event_bus::InProcessEventBus;
use hookflow_app::execution_engine::ExecutionEngine;
use hookflow_app::ports::{AutomationRepository, ExecutionRecorder, HttpClient, WebhookRepository};
use hookflow_app::services::automation_service::AutomationService;
use hookflow_app::services::execution_service::ExecutionService;
use hookflow_app::services::webhook_service::WebhookService;

/// Engine type driven by the HTTP layer: progress goes to the in-process bus.
pub type Engine<AR, WR, ER, H> = ExecutionEngine<AR, WR, ER, H, Arc<InProcessEventBus>>;

/// Application state shared across all axum handlers.
///
/// Generic over the automation repository, webhook repository, execution
/// recorder and outbound HTTP client to avoid dynamic dispatch.
/// `Clone` is implemented manually so the underlying types themselves do not
/// need to be `Clone`; only the `Arc` wrappers and the engine handle are cloned.
pub struct AppState<AR, WR, ER, H> {
    /// Automation CRUD and step arrangement.
    pub automation_service: Arc<AutomationService<AR>>,
    /// Webhook CRUD and test dispatches.
    pub webhook_service: Arc<WebhookService<WR, H>>,
    /// Execution history queries.
    pub execution_service: Arc<ExecutionService<ER>>,
    /// Runs automations.
    pub engine: Engine<AR, WR, ER, H>,
    /// Source of the SSE progress stream.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<AR, WR, ER, H> Clone for AppState<AR, WR, ER, H> {
    fn clone(&self) -> Self {
        Self {
            automation_service: Arc::clone(&self.automation_service),
            webhook_service: Arc::clone(&self.webhook_service),
            execution_service: Arc::clone(&self.execution_service),
            engine: self.engine.clone(),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<AR, WR, ER, H> AppState<AR, WR, ER, H>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    /// Create a new application state from service instances.
    pub fn new(
        automation_service: AutomationService<AR>,
        webhook_service: WebhookService<WR, H>,
        execution_service: ExecutionService<ER>,
        engine: Engine<AR, WR, ER, H>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            automation_service: Arc::new(automation_service),
            webhook_service: Arc::new(webhook_service),
            execution_service: Arc::new(execution_service),
            engine,
            event_bus,
        }
    }
}
