//! Execution service: read access to recorded executions.

use hookflow_domain::error::{HookflowError, NotFoundError};
use hookflow_domain::execution::AutomationExecution;
use hookflow_domain::id::{AutomationId, ExecutionId};

use crate::ports::ExecutionRecorder;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIST_LIMIT: u32 = 20;
/// Largest page [`ExecutionService::list`] returns.
pub const MAX_LIST_LIMIT: u32 = 100;

/// Application service for execution history queries.
pub struct ExecutionService<ER> {
    recorder: ER,
}

impl<ER: ExecutionRecorder> ExecutionService<ER> {
    pub fn new(recorder: ER) -> Self {
        Self { recorder }
    }

    /// Newest-first executions of an automation, each with its step trail.
    ///
    /// `limit` defaults to [`DEFAULT_LIST_LIMIT`] and is clamped to
    /// `1..=MAX_LIST_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the recorder.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        automation_id: AutomationId,
        limit: Option<u32>,
    ) -> Result<Vec<AutomationExecution>, HookflowError> {
        let limit = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        self.recorder.list(automation_id, limit).await
    }

    /// Load one execution.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] when no execution with `id` exists,
    /// or a storage error from the recorder.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ExecutionId) -> Result<AutomationExecution, HookflowError> {
        self.recorder.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Execution",
                id: id.to_string(),
            }
            .into()
        })
    }
}
