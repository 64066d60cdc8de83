//! Execution events, published while an automation runs so observers can follow progress.

use serde::{Deserialize, Serialize};

use crate::execution::{ExecutionStatus, StepStatus};
use crate::id::{AutomationId, ExecutionId, StepId};
use crate::time::{Timestamp, now};

/// Something that happened to an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub execution_id: ExecutionId,
    pub automation_id: AutomationId,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: ExecutionEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEventKind {
    Started {
        total_steps: u32,
    },
    StepRecorded {
        step_id: StepId,
        step_order: u32,
        status: StepStatus,
        completed_steps: u32,
    },
    Finished {
        status: ExecutionStatus,
        error_message: Option<String>,
    },
}

impl ExecutionEvent {
    /// Stamp a new event with the current time.
    #[must_use]
    pub fn new(
        execution_id: ExecutionId,
        automation_id: AutomationId,
        kind: ExecutionEventKind,
    ) -> Self {
        Self {
            execution_id,
            automation_id,
            timestamp: now(),
            kind,
        }
    }

    /// SSE event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.kind {
            ExecutionEventKind::Started { .. } => "started",
            ExecutionEventKind::StepRecorded { .. } => "step_recorded",
            ExecutionEventKind::Finished { .. } => "finished",
        }
    }
}
