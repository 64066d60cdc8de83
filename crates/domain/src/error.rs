//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HookflowError`]
//! via `#[from]`. Adapter errors are boxed into the [`HookflowError::Storage`]
//! and [`HookflowError::Internal`] variants so the domain never names them.

use crate::id::{AutomationId, ExecutionId, StepId, WebhookId};

/// Top-level error returned by services, ports and the execution engine.
#[derive(Debug, thiserror::Error)]
pub enum HookflowError {
    /// A domain invariant was violated by the caller's input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The requested record does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The stored configuration cannot be used (missing or inactive webhook, inactive automation).
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An execution record was asked to make an illegal status transition.
    #[error("invalid transition: {0}")]
    Transition(#[from] TransitionError),

    /// The persistence layer failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),

    /// An unexpected runtime failure (e.g. a panicked execution task).
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Invariant violations detected while building or updating domain objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("url must be an absolute http(s) url, got `{0}`")]
    InvalidUrl(String),

    #[error("timeout_seconds must be greater than zero")]
    ZeroTimeout,

    #[error("duplicate header `{0}`")]
    DuplicateHeader(String),

    #[error("header name must not be empty")]
    EmptyHeaderName,

    #[error("header `{0}` is not a valid HTTP header")]
    InvalidHeader(String),

    #[error("step_order {0} is already used in this automation")]
    DuplicateStepOrder(u32),

    #[error("no step_order left after {0}")]
    StepOrderExhausted(u32),

    #[error("step {0} does not belong to this automation")]
    UnknownStep(StepId),

    #[error("reorder must list every step exactly once")]
    IncompleteReorder,

    #[error("invalid identifier `{0}`")]
    InvalidId(String),

    #[error("unknown {field} `{value}`")]
    UnknownValue { field: &'static str, value: String },

    #[error("unsupported condition schema version {0}")]
    UnsupportedConditionVersion(u32),

    #[error("malformed condition: {0}")]
    MalformedCondition(String),

    #[error("malformed dynamic payload template: {0}")]
    MalformedTemplate(String),

    #[error("trigger data must be a JSON object")]
    TriggerDataNotObject,

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} `{id}` not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Stored configuration that prevents a step (or a whole run) from being dispatched.
///
/// Never retried: the step fails immediately with zero attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("webhook {0} does not exist")]
    WebhookMissing(WebhookId),

    #[error("webhook {0} is inactive")]
    WebhookInactive(WebhookId),

    #[error("automation {0} is inactive")]
    AutomationInactive(AutomationId),
}

/// Illegal change to an [`AutomationExecution`](crate::execution::AutomationExecution).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("execution {0} is already terminal")]
    AlreadyTerminal(ExecutionId),

    #[error("execution {0} is not pending")]
    NotPending(ExecutionId),

    #[error("`{0}` is not a terminal status")]
    NotTerminalStatus(&'static str),

    #[error("step result belongs to execution {found}, expected {expected}")]
    ForeignStep {
        expected: ExecutionId,
        found: ExecutionId,
    },

    #[error("execution {0} already counts every step as completed")]
    StepOverflow(ExecutionId),

    #[error("execution {0} is not running in this process")]
    NotRunning(ExecutionId),
}
