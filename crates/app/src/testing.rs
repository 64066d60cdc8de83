//! In-memory port implementations shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use hookflow_domain::automation::Automation;
use hookflow_domain::context::TriggerData;
use hookflow_domain::dispatch::{DispatchError, DispatchRequest, DispatchResponse};
use hookflow_domain::error::{HookflowError, NotFoundError};
use hookflow_domain::event::ExecutionEvent;
use hookflow_domain::execution::{AutomationExecution, ExecutionStatus, StepExecutionResult};
use hookflow_domain::id::{AutomationId, ExecutionId, WebhookId};
use hookflow_domain::time::now;
use hookflow_domain::webhook::Webhook;

use crate::ports::{
    AutomationRepository, EventPublisher, ExecutionRecorder, HttpClient, WebhookRepository,
};

// ── Webhooks ───────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryWebhookRepo {
    store: Mutex<HashMap<WebhookId, Webhook>>,
}

impl InMemoryWebhookRepo {
    pub(crate) fn with(webhooks: Vec<Webhook>) -> Self {
        Self {
            store: Mutex::new(webhooks.into_iter().map(|w| (w.id, w)).collect()),
        }
    }
}

impl WebhookRepository for InMemoryWebhookRepo {
    fn create(
        &self,
        webhook: Webhook,
    ) -> impl Future<Output = Result<Webhook, HookflowError>> + Send {
        self.store.lock().unwrap().insert(webhook.id, webhook.clone());
        async { Ok(webhook) }
    }

    fn get_by_id(
        &self,
        id: WebhookId,
    ) -> impl Future<Output = Result<Option<Webhook>, HookflowError>> + Send {
        let r = self.store.lock().unwrap().get(&id).cloned();
        async { Ok(r) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Webhook>, HookflowError>> + Send {
        let r: Vec<_> = self.store.lock().unwrap().values().cloned().collect();
        async { Ok(r) }
    }

    fn update(

        &self,

        webhook: Webhook,

    ) -> impl Future<Output = Result<Webhook, HookflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        let r = if store.contains_key(&webhook.id) {
            store.insert(webhook.id, webhook.clone());
            Ok(webhook)
        } else {
            Err(not_found("Webhook", webhook.id))
        };
        async { r }
    }

    fn delete(&self, id: WebhookId) -> impl Future<Output = Result<(), HookflowError>> + Send {
        self.store.lock().unwrap().remove(&id);
        async { Ok(()) }
    }
}

// ── Automations ────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryAutomationRepo {
    store: Mutex<HashMap<AutomationId, Automation>>,
}

impl InMemoryAutomationRepo {
    pub(crate) fn with(automations: Vec<Automation>) -> Self {
        Self {
            store: Mutex::new(automations.into_iter().map(|a| (a.id, a)).collect()),
        }
    }
}

impl AutomationRepository for InMemoryAutomationRepo {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HookflowError>> + Send {
        self.store
            .lock()
            .unwrap()
            .insert(automation.id, automation.clone());
        async { Ok(automation) }
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HookflowError>> + Send {
        let r = self.store.lock().unwrap().get(&id).cloned();
        async { Ok(r) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, HookflowError>> + Send {
        let r: Vec<_> = self.store.lock().unwrap().values().cloned().collect();
        async { Ok(r) }
    }

    fn get_active(&self) -> impl Future<Output = Result<Vec<Automation>, HookflowError>> + Send {
        let r: Vec<_> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect();
        async { Ok(r) }
    }

    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HookflowError>> + Send {
        let mut store = self.store.lock().unwrap();
        let r = if store.contains_key(&automation.id) {
            store.insert(automation.id, automation.clone());
            Ok(automation)
        } else {
            Err(not_found("Automation", automation.id))
        };
        async { r }
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), HookflowError>> + Send {
        self.store.lock().unwrap().remove(&id);
        async { Ok(()) }
    }
}

// ── Executions ─────────────────────────────────────────────────────

/// Recorder applying the domain transition rules in memory.
///
/// `fail_after_steps(n)` makes every `record_step` after the first `n` fail
/// with a storage error.
#[derive(Default)]
pub(crate) struct InMemoryRecorder {
    store: Mutex<HashMap<ExecutionId, AutomationExecution>>,
    step_budget: Option<usize>,
    recorded: AtomicUsize,
    step_recorded_at: Mutex<Vec<Instant>>,
}

#[derive(Debug)]
pub(crate) struct StoreDown;

impl std::fmt::Display for StoreDown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("store down")
    }
}

impl std::error::Error for StoreDown {}

impl InMemoryRecorder {
    pub(crate) fn fail_after_steps(steps: usize) -> Self {
        Self {
            step_budget: Some(steps),
            ..Self::default()
        }
    }

    pub(crate) fn all(&self) -> Vec<AutomationExecution> {
        self.store.lock().unwrap().values().cloned().collect()
    }

    /// Instants at which step results were stored, in recording order.
    pub(crate) fn step_recorded_at(&self) -> Vec<Instant> {
        self.step_recorded_at.lock().unwrap().clone()
    }

    fn update(
        &self,
        id: ExecutionId,
        f: impl FnOnce(&mut AutomationExecution) -> Result<(), HookflowError>,
    ) -> Result<AutomationExecution, HookflowError> {
        let mut store = self.store.lock().unwrap();
        let execution = store.get_mut(&id).ok_or_else(|| not_found("Execution", id))?;
        let mut next = execution.clone();
        f(&mut next)?;
        *execution = next.clone();
        Ok(next)
    }
}

impl ExecutionRecorder for InMemoryRecorder {
    fn start(
        &self,
        automation_id: AutomationId,
        trigger_data: TriggerData,
        total_steps: u32,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send {
        let execution = AutomationExecution::new(automation_id, trigger_data, total_steps);
        self.store
            .lock()
            .unwrap()
            .insert(execution.id, execution.clone());
        async { Ok(execution) }
    }

    fn mark_running(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send {
        let r = self.update(id, |e| Ok(e.mark_running()?));
        async { r }
    }

    fn record_step(
        &self,
        result: StepExecutionResult,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send {
        let done = self.recorded.fetch_add(1, Ordering::SeqCst);
        let r = if self.step_budget.is_some_and(|budget| done >= budget) {
            Err(HookflowError::Storage(Box::new(StoreDown)))
        } else {
            let r = self.update(result.execution_id, |e| Ok(e.apply_step(result)?));
            self.step_recorded_at.lock().unwrap().push(Instant::now());
            r
        };
        async { r }
    }

    fn finish(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send {
        let r = self.update(id, |e| Ok(e.finish(status, error_message, now())?));
        async { r }
    }

    fn get_by_id(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<Option<AutomationExecution>, HookflowError>> + Send {
        let r = self.store.lock().unwrap().get(&id).cloned();
        async { Ok(r) }
    }

    fn list(
        &self,
        automation_id: AutomationId,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<AutomationExecution>, HookflowError>> + Send {
        let mut r: Vec<_> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.automation_id == automation_id)
            .cloned()
            .collect();
        r.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        r.truncate(limit as usize);
        async { Ok(r) }
    }
}

// ── Events ─────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct RecordingPublisher {
    pub(crate) events: Mutex<Vec<ExecutionEvent>>,
}

impl EventPublisher for RecordingPublisher {
    fn publish(
        &self,
        event: ExecutionEvent,
    ) -> impl Future<Output = Result<(), HookflowError>> + Send {
        self.events.lock().unwrap().push(event);
        async { Ok(()) }
    }
}

// ── HTTP ───────────────────────────────────────────────────────────

/// Scripted [`HttpClient`]: replays queued replies per URL, then repeats a fallback.
pub(crate) struct FakeHttpClient {
    replies: Mutex<HashMap<String, VecDeque<Result<DispatchResponse, DispatchError>>>>,
    by_url: HashMap<String, Result<DispatchResponse, DispatchError>>,
    fallback: Result<DispatchResponse, DispatchError>,
    delay: Duration,
    requests: Mutex<Vec<DispatchRequest>>,
    sent_at: Mutex<Vec<Instant>>,
}

pub(crate) fn response(status_code: u16, body: &str) -> DispatchResponse {
    DispatchResponse {
        status_code,
        body: body.to_string(),
        latency: Duration::ZERO,
    }
}

impl FakeHttpClient {
    pub(crate) fn always(status_code: u16) -> Self {
        Self::scripted(Vec::new(), Ok(response(status_code, "")))
    }

    /// Replies in order for any URL, then `fallback` forever.
    pub(crate) fn scripted(
        replies: Vec<Result<DispatchResponse, DispatchError>>,
        fallback: Result<DispatchResponse, DispatchError>,
    ) -> Self {
        Self {
            replies: Mutex::new(HashMap::from([(String::new(), replies.into())])),
            by_url: HashMap::new(),
            fallback,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            sent_at: Mutex::new(Vec::new()),
        }
    }

    /// Always answer `status_code` (with `body`) for `url`.
    pub(crate) fn route(mut self, url: &str, status_code: u16, body: &str) -> Self {
        self.by_url
            .insert(url.to_string(), Ok(response(status_code, body)));
        self
    }

    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn sent(&self) -> Vec<DispatchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }

    pub(crate) fn sent_to(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

impl HttpClient for FakeHttpClient {
    fn send(
        &self,
        request: DispatchRequest,
    ) -> impl Future<Output = Result<DispatchResponse, DispatchError>> + Send {
        let reply = match self.by_url.get(&request.url) {
            Some(reply) => reply.clone(),
            None => self
                .replies
                .lock()
                .unwrap()
                .get_mut("")
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| self.fallback.clone()),
        };
        self.requests.lock().unwrap().push(request);
        self.sent_at.lock().unwrap().push(Instant::now());
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            reply
        }
    }
}

pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> HookflowError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}
