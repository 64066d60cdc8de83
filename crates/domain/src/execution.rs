//! Execution records: one run of an automation and its per-step trail.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::TriggerData;
use crate::error::{TransitionError, ValidationError};
use crate::id::{AutomationId, ExecutionId, StepId};
use crate::time::{Timestamp, now};

/// Response bodies are stored up to this many bytes.
pub const MAX_RESPONSE_BODY_BYTES: usize = 10 * 1024;

/// Error message recorded on executions stopped by cancellation or shutdown.
pub const CANCELLED_MESSAGE: &str = "execution cancelled";

/// Lifecycle of an [`AutomationExecution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ValidationError::UnknownValue {
                field: "execution status",
                value: s.to_string(),
            }),
        }
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Skipped,
    Succeeded,
    Failed,
}

impl StepStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skipped" => Ok(Self::Skipped),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(ValidationError::UnknownValue {
                field: "step status",
                value: s.to_string(),
            }),
        }
    }
}

/// Recorded outcome of one step of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecutionResult {
    pub execution_id: ExecutionId,
    pub step_id: StepId,
    pub step_order: u32,
    pub status: StepStatus,
    pub http_status: Option<u16>,
    pub response_body: Option<String>,
    pub error: Option<String>,
    pub attempt_count: u32,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
}

impl StepExecutionResult {
    /// A step whose condition did not hold.
    #[must_use]
    pub fn skipped(execution_id: ExecutionId, step_id: StepId, step_order: u32) -> Self {
        let at = now();
        Self {
            execution_id,
            step_id,
            step_order,
            status: StepStatus::Skipped,
            http_status: None,
            response_body: None,
            error: None,
            attempt_count: 0,
            started_at: at,
            completed_at: at,
        }
    }

    /// Attach a response body, truncated to [`MAX_RESPONSE_BODY_BYTES`].
    #[must_use]
    pub fn with_response_body(mut self, body: Option<String>) -> Self {
        self.response_body = body.map(truncate_body);
        self
    }
}

/// Cut `body` to at most [`MAX_RESPONSE_BODY_BYTES`] without splitting a UTF-8 sequence.
#[must_use]
pub fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_RESPONSE_BODY_BYTES {
        let mut cut = MAX_RESPONSE_BODY_BYTES;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

/// One run of an automation.
///
/// Status only moves forward: `pending → running → completed | failed`
/// (a pending run may also finish directly). Once terminal, the record is
/// frozen and every mutating method returns a [`TransitionError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationExecution {
    pub id: ExecutionId,
    pub automation_id: AutomationId,
    pub status: ExecutionStatus,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub trigger_data: TriggerData,
    pub error_message: Option<String>,
    pub completed_steps: u32,
    pub total_steps: u32,
    #[serde(default)]
    pub steps: Vec<StepExecutionResult>,
}

impl AutomationExecution {
    /// A fresh pending execution.
    #[must_use]
    pub fn new(automation_id: AutomationId, trigger_data: TriggerData, total_steps: u32) -> Self {
        Self {
            id: ExecutionId::new(),
            automation_id,
            status: ExecutionStatus::Pending,
            started_at: now(),
            completed_at: None,
            trigger_data,
            error_message: None,
            completed_steps: 0,
            total_steps,
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move from `pending` to `running`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotPending`] from any other status.
    pub fn mark_running(&mut self) -> Result<(), TransitionError> {
        if self.status != ExecutionStatus::Pending {
            return Err(TransitionError::NotPending(self.id));
        }
        self.status = ExecutionStatus::Running;
        Ok(())
    }

    /// Append a step result; a succeeded step increments `completed_steps`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] when the execution is terminal, the
    /// result belongs to another execution, or the success would exceed
    /// `total_steps`.
    pub fn apply_step(&mut self, result: StepExecutionResult) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::AlreadyTerminal(self.id));
        }
        if result.execution_id != self.id {
            return Err(TransitionError::ForeignStep {
                expected: self.id,
                found: result.execution_id,
            });
        }
        if result.status == StepStatus::Succeeded {
            if self.completed_steps >= self.total_steps {
                return Err(TransitionError::StepOverflow(self.id));
            }
            self.completed_steps += 1;
        }
        self.steps.push(result);
        Ok(())
    }

    /// Move to a terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotTerminalStatus`] when `status` is not
    /// terminal and [`TransitionError::AlreadyTerminal`] when the execution
    /// already finished.
    pub fn finish(
        &mut self,
        status: ExecutionStatus,
        error_message: Option<String>,
        at: Timestamp,
    ) -> Result<(), TransitionError> {
        if !status.is_terminal() {
            return Err(TransitionError::NotTerminalStatus(status.as_str()));
        }
        if self.is_terminal() {
            return Err(TransitionError::AlreadyTerminal(self.id));
        }
        self.status = status;
        self.error_message = error_message;
        self.completed_at = Some(at);
        Ok(())
    }
}
