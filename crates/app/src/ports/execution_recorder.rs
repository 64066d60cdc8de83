//! Execution recorder port: the durable, incrementally updated log of runs.

use std::future::Future;

use hookflow_domain::context::TriggerData;
use hookflow_domain::error::HookflowError;
use hookflow_domain::execution::{AutomationExecution, ExecutionStatus, StepExecutionResult};
use hookflow_domain::id::{AutomationId, ExecutionId};

/// Durable log of automation executions.
///
/// Every write must be committed before the returned future resolves. The
/// recorder applies the same transition rules as [`AutomationExecution`]:
/// nothing is appended to a terminal execution.
pub trait ExecutionRecorder {
    /// Create a `pending` execution.
    fn start(
        &self,
        automation_id: AutomationId,
        trigger_data: TriggerData,
        total_steps: u32,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send;

    /// Move a pending execution to `running`.
    fn mark_running(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send;

    /// Append a step result, bumping `completed_steps` for a success.
    fn record_step(
        &self,
        result: StepExecutionResult,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send;

    /// Move an execution to a terminal status.
    fn finish(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send;

    /// Load one execution with its step trail.
    fn get_by_id(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<Option<AutomationExecution>, HookflowError>> + Send;

    /// Newest-first executions of an automation, each with its step trail.
    fn list(
        &self,
        automation_id: AutomationId,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<AutomationExecution>, HookflowError>> + Send;
}

impl<T: ExecutionRecorder + Send + Sync> ExecutionRecorder for std::sync::Arc<T> {
    fn start(
        &self,
        automation_id: AutomationId,
        trigger_data: TriggerData,
        total_steps: u32,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send {
        (**self).start(automation_id, trigger_data, total_steps)
    }

    fn mark_running(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send {
        (**self).mark_running(id)
    }

    fn record_step(
        &self,
        result: StepExecutionResult,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send {
        (**self).record_step(result)
    }

    fn finish(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> impl Future<Output = Result<AutomationExecution, HookflowError>> + Send {
        (**self).finish(id, status, error_message)
    }

    fn get_by_id(
        &self,
        id: ExecutionId,
    ) -> impl Future<Output = Result<Option<AutomationExecution>, HookflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn list(
        &self,
        automation_id: AutomationId,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<AutomationExecution>, HookflowError>> + Send {
        (**self).list(automation_id, limit)
    }
}
