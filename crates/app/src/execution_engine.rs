//! Execution engine: runs an automation's steps in order and records every outcome.
//!
//! [`ExecutionEngine::execute`] creates the execution record, moves it to
//! `running` and spawns one tokio task that walks the steps in ascending
//! `step_order`. For each step the engine evaluates the condition (fail
//! closed), waits the configured delay, renders the payload and dispatches
//! the webhook under its retry policy. Every step result is committed
//! through the [`ExecutionRecorder`] before the next step starts; a failed
//! step aborts the run unless it is marked `continue_on_failure`.
//!
//! Waits (step delay, retry backoff) race a per-execution
//! [`CancellationToken`] derived from the engine's shutdown token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use hookflow_domain::automation::{Automation, Step};
use hookflow_domain::context::{Context, TriggerData};
use hookflow_domain::dispatch::DispatchFailure;
use hookflow_domain::error::{ConfigurationError, HookflowError, NotFoundError};
use hookflow_domain::event::{ExecutionEvent, ExecutionEventKind};
use hookflow_domain::execution::{
    AutomationExecution, CANCELLED_MESSAGE, ExecutionStatus, StepExecutionResult, StepStatus,
};
use hookflow_domain::id::{AutomationId, ExecutionId};
use hookflow_domain::retry::RetryPolicy;
use hookflow_domain::time::now;

use crate::condition_evaluator::ConditionEvaluator;
use crate::dispatcher::WebhookDispatcher;
use crate::payload_renderer::render_payload;
use crate::ports::{
    AutomationRepository, EventPublisher, ExecutionRecorder, HttpClient, WebhookRepository,
};

/// A started execution.
#[derive(Debug)]
pub struct ExecutionHandle {
    pub execution_id: ExecutionId,
    join: JoinHandle<Result<AutomationExecution, HookflowError>>,
}

impl ExecutionHandle {
    /// Wait for the execution to reach a terminal status.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the run (a recorder failure) or
    /// [`HookflowError::Internal`] when the execution task panicked.
    pub async fn wait(self) -> Result<AutomationExecution, HookflowError> {
        self.join
            .await
            .map_err(|err| HookflowError::Internal(Box::new(err)))?
    }
}

/// Orchestrates automation executions.
///
/// Cheap to clone; clones share the same ports and cancellation registry.
pub struct ExecutionEngine<AR, WR, ER, H, P> {
    inner: Arc<Inner<AR, WR, ER, H, P>>,
}

impl<AR, WR, ER, H, P> Clone for ExecutionEngine<AR, WR, ER, H, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<AR, WR, ER, H, P> {
    automations: AR,
    webhooks: WR,
    recorder: ER,
    dispatcher: WebhookDispatcher<H>,
    conditions: ConditionEvaluator,
    publisher: P,
    shutdown: CancellationToken,
    running: Mutex<HashMap<ExecutionId, CancellationToken>>,
}

enum StepRun {
    /// The step produced a result to record.
    Finished(StepExecutionResult),
    /// Cancellation hit; a partially attempted step may still need recording.
    Cancelled(Option<StepExecutionResult>),
    /// Storage failed while preparing the step.
    Fatal(HookflowError),
}

impl<AR, WR, ER, H, P> ExecutionEngine<AR, WR, ER, H, P>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    pub fn new(automations: AR, webhooks: WR, recorder: ER, client: H, publisher: P) -> Self {
        Self {
            inner: Arc::new(Inner {
                automations,
                webhooks,
                recorder,
                dispatcher: WebhookDispatcher::new(client),
                conditions: ConditionEvaluator::new(),
                publisher,
                shutdown: CancellationToken::new(),
                running: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start an execution of `automation_id` and return without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] for an unknown automation,
    /// [`HookflowError::Configuration`] for an inactive one, or a storage
    /// error if the execution record cannot be created.
    #[tracing::instrument(skip(self, trigger_data))]
    pub async fn execute(
        &self,
        automation_id: AutomationId,
        trigger_data: TriggerData,
    ) -> Result<ExecutionHandle, HookflowError> {
        let automation = self
            .inner
            .automations
            .get_by_id(automation_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Automation",
                id: automation_id.to_string(),
            })?;
        if !automation.is_active {
            return Err(ConfigurationError::AutomationInactive(automation_id).into());
        }
        self.start(automation, trigger_data).await
    }

    /// Start every active automation triggered by a submission of `form_id`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if automations cannot be listed or an
    /// execution record cannot be created.
    #[tracing::instrument(skip(self, data))]
    pub async fn execute_form_submission(
        &self,
        form_id: &str,
        data: TriggerData,
    ) -> Result<Vec<ExecutionHandle>, HookflowError> {
        let automations = self.inner.automations.get_active().await?;
        let mut handles = Vec::new();
        for automation in automations
            .into_iter()
            .filter(|a| a.trigger.matches_form(form_id))
        {
            handles.push(self.start(automation, data.clone()).await?);
        }
        tracing::debug!(started = handles.len(), "form submission dispatched");
        Ok(handles)
    }

    /// Request cancellation of a running execution.
    ///
    /// Returns `false` when the execution is not running in this process.
    pub fn cancel(&self, execution_id: ExecutionId) -> bool {
        let running = self
            .inner
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match running.get(&execution_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight execution. Used on process shutdown.
    pub fn shutdown(&self) {
        tracing::info!("cancelling in-flight executions");
        self.inner.shutdown.cancel();
    }

    /// Ids of executions currently running in this process.
    #[must_use]
    pub fn running(&self) -> Vec<ExecutionId> {
        self.inner
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    async fn start(
        &self,
        automation: Automation,
        trigger_data: TriggerData,
    ) -> Result<ExecutionHandle, HookflowError> {
        let inner = &self.inner;
        let execution = inner
            .recorder
            .start(automation.id, trigger_data, automation.total_steps())
            .await?;
        let execution = match inner.recorder.mark_running(execution.id).await {
            Ok(execution) => execution,
            Err(err) => {
                tracing::error!(
                    execution_id = %execution.id,
                    error = %err,
                    "failed to mark execution running"
                );
                let _ = inner
                    .recorder
                    .finish(execution.id, ExecutionStatus::Failed, Some(err.to_string()))
                    .await;
                return Err(err);
            }
        };
        let execution_id = execution.id;
        inner
            .publish(
                &execution,
                ExecutionEventKind::Started {
                    total_steps: execution.total_steps,
                },
            )
            .await;

        let token = inner.shutdown.child_token();
        inner
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(execution_id, token.clone());

        let span = tracing::info_span!(
            "execution",
            %execution_id,
            automation_id = %automation.id,
        );
        let task_inner = Arc::clone(inner);
        let join = tokio::spawn(
            async move {
                let result = task_inner.run(execution, &automation, &token).await;
                task_inner
                    .running
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&execution_id);
                result
            }
            .instrument(span),
        );

        Ok(ExecutionHandle { execution_id, join })
    }
}

impl<AR, WR, ER, H, P> Inner<AR, WR, ER, H, P>
where
    AR: AutomationRepository,
    WR: WebhookRepository,
    ER: ExecutionRecorder,
    H: HttpClient,
    P: EventPublisher,
{
    async fn run(
        &self,
        mut execution: AutomationExecution,
        automation: &Automation,
        cancel: &CancellationToken,
    ) -> Result<AutomationExecution, HookflowError> {
        tracing::info!(total_steps = execution.total_steps, "execution started");
        let mut ctx = Context::from_trigger(&execution.trigger_data);

        for step in automation.steps.iter() {
            if cancel.is_cancelled() {
                return self.cancelled(&execution).await;
            }

            let (result, cancelled) = match self.run_step(execution.id, step, &ctx, cancel).await {
                StepRun::Finished(result) => (Some(result), false),
                StepRun::Cancelled(result) => (result, true),
                StepRun::Fatal(err) => return self.abort(&execution, err).await,
            };

            if let Some(result) = result {
                let status = result.status;
                let error = result.error.clone();
                ctx.insert_step_result(
                    step.step_order,
                    status,
                    result.http_status,
                    result.response_body.as_deref(),
                );
                execution = match self.recorder.record_step(result).await {
                    Ok(execution) => execution,
                    Err(err) => return self.abort(&execution, err).await,
                };
                self.publish(
                    &execution,
                    ExecutionEventKind::StepRecorded {
                        step_id: step.id,
                        step_order: step.step_order,
                        status,
                        completed_steps: execution.completed_steps,
                    },
                )
                .await;

                if status == StepStatus::Failed && !cancelled {
                    let error = error.unwrap_or_default();
                    if step.continue_on_failure {
                        tracing::warn!(
                            step_order = step.step_order,
                            %error,
                            "step failed, continuing"
                        );
                    } else {
                        let message = format!("step {} failed: {error}", step.step_order);
                        return self
                            .conclude(&execution, ExecutionStatus::Failed, Some(message))
                            .await;
                    }
                }
            }

            if cancelled {
                return self.cancelled(&execution).await;
            }
        }

        self.conclude(&execution, ExecutionStatus::Completed, None).await
    }

    async fn run_step(
        &self,
        execution_id: ExecutionId,
        step: &Step,
        ctx: &Context,
        cancel: &CancellationToken,
    ) -> StepRun {
        if step.is_conditional
            && !self
                .conditions
                .evaluate(step.condition_config.as_ref(), ctx)
        {
            tracing::debug!(step_order = step.step_order, "condition not met, skipping step");
            return StepRun::Finished(StepExecutionResult::skipped(
                execution_id,
                step.id,
                step.step_order,
            ));
        }

        if step.delay_seconds > 0 {
            tokio::select! {
                () = cancel.cancelled() => return StepRun::Cancelled(None),
                () = tokio::time::sleep(step.delay()) => {}
            }
        }

        let started_at = now();
        let failed = |attempt_count: u32, failure: &DispatchFailure| {
            let (http_status, body) = match failure {
                DispatchFailure::Dispatch(err) => {
                    (err.status_code(), err.body().map(str::to_owned))
                }
                DispatchFailure::Configuration(_) | DispatchFailure::Cancelled => (None, None),
            };
            let error = match failure {
                DispatchFailure::Cancelled => CANCELLED_MESSAGE.to_string(),
                other => other.to_string(),
            };
            StepExecutionResult {
                execution_id,
                step_id: step.id,
                step_order: step.step_order,
                status: StepStatus::Failed,
                http_status,
                response_body: None,
                error: Some(error),
                attempt_count,
                started_at,
                completed_at: now(),
            }
            .with_response_body(body)
        };

        let webhook = match self.webhooks.get_by_id(step.webhook_id).await {
            Ok(Some(webhook)) => webhook,
            Ok(None) => {
                let failure: DispatchFailure =
                    ConfigurationError::WebhookMissing(step.webhook_id).into();
                return StepRun::Finished(failed(0, &failure));
            }
            Err(err) => return StepRun::Fatal(err),
        };

        let payload = render_payload(&webhook, ctx);
        let policy = RetryPolicy::for_step(&webhook, step.retry_on_failure);
        let outcome = self
            .dispatcher
            .dispatch_with_retry(&webhook, &payload, &policy, cancel)
            .await;

        match outcome.result {
            Ok(response) => {
                tracing::info!(
                    step_order = step.step_order,
                    status_code = response.status_code,
                    attempts = outcome.attempts,
                    latency_ms = u64::try_from(response.latency.as_millis()).unwrap_or(u64::MAX),
                    "step succeeded"
                );
                StepRun::Finished(
                    StepExecutionResult {
                        execution_id,
                        step_id: step.id,
                        step_order: step.step_order,
                        status: StepStatus::Succeeded,
                        http_status: Some(response.status_code),
                        response_body: None,
                        error: None,
                        attempt_count: outcome.attempts,
                        started_at,
                        completed_at: now(),
                    }
                    .with_response_body(Some(response.body)),
                )
            }
            Err(DispatchFailure::Cancelled) => {
                StepRun::Cancelled(Some(failed(outcome.attempts, &DispatchFailure::Cancelled)))
            }
            Err(failure) => {
                tracing::warn!(
                    step_order = step.step_order,
                    attempts = outcome.attempts,
                    error = %failure,
                    "step failed"
                );
                StepRun::Finished(failed(outcome.attempts, &failure))
            }
        }
    }

    async fn conclude(
        &self,
        execution: &AutomationExecution,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> Result<AutomationExecution, HookflowError> {
        let finished = match self
            .recorder
            .finish(execution.id, status, error_message)
            .await
        {
            Ok(finished) => finished,
            Err(err) => {
                tracing::error!(error = %err, "failed to record execution outcome");
                return Err(err);
            }
        };
        tracing::info!(
            status = %finished.status,
            completed_steps = finished.completed_steps,
            total_steps = finished.total_steps,
            "execution finished"
        );
        self.publish(
            &finished,
            ExecutionEventKind::Finished {
                status: finished.status,
                error_message: finished.error_message.clone(),
            },
        )
        .await;
        Ok(finished)
    }

    async fn cancelled(
        &self,
        execution: &AutomationExecution,
    ) -> Result<AutomationExecution, HookflowError> {
        tracing::info!("execution cancelled");
        self.conclude(
            execution,
            ExecutionStatus::Failed,
            Some(CANCELLED_MESSAGE.to_string()),
        )
        .await
    }

    /// Stop after a storage failure, keeping what was already recorded.
    async fn abort(
        &self,
        execution: &AutomationExecution,
        err: HookflowError,
    ) -> Result<AutomationExecution, HookflowError> {
        tracing::error!(error = %err, "persistence failure, aborting execution");
        let _ = self
            .conclude(
                execution,
                ExecutionStatus::Failed,
                Some(format!("persistence failure: {err}")),
            )
            .await;
        Err(err)
    }

    async fn publish(&self, execution: &AutomationExecution, kind: ExecutionEventKind) {
        let event = ExecutionEvent::new(execution.id, execution.automation_id, kind);
        let _ = self.publisher.publish(event).await;
    }
}
