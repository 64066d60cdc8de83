//! Automation: a named, ordered sequence of webhook steps started by a trigger.
//!
//! Each automation has a [`Trigger`] describing how it is started and a
//! [`StepSequence`] of [`Step`]s executed in ascending `step_order`. Steps
//! may be guarded by a versioned [`ConditionConfig`].

mod condition;
mod step;
mod trigger;

pub use condition::{
    CONDITION_SCHEMA_VERSION, ConditionConfig, ConditionError, Rule, evaluate_raw,
};
pub use step::{Step, StepBuilder, StepSequence};
pub use trigger::Trigger;

use serde::{Deserialize, Serialize};

use crate::error::{HookflowError, ValidationError};
use crate::id::AutomationId;
use crate::time::{Timestamp, now};

/// A named sequence of webhook calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub trigger: Trigger,
    #[serde(default)]
    pub steps: StepSequence,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Automation {
    /// Create a builder for constructing an [`Automation`].
    #[must_use]
    pub fn builder() -> AutomationBuilder {
        AutomationBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::Validation`] when `name` is empty
    /// ([`ValidationError::EmptyName`]) or a step belongs to another
    /// automation ([`ValidationError::UnknownStep`]).
    pub fn validate(&self) -> Result<(), HookflowError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(foreign) = self.steps.iter().find(|s| s.automation_id != self.id) {
            return Err(ValidationError::UnknownStep(foreign.id).into());
        }
        Ok(())
    }

    /// Number of steps an execution of this automation walks through.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        u32::try_from(self.steps.len()).unwrap_or(u32::MAX)
    }
}

/// Step-by-step builder for [`Automation`].
#[derive(Debug, Default)]
pub struct AutomationBuilder {
    id: Option<AutomationId>,
    name: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
    trigger: Option<Trigger>,
    steps: Vec<Step>,
    created_at: Option<Timestamp>,
}

impl AutomationBuilder {
    #[must_use]
    pub fn id(mut self, id: AutomationId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn is_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`Automation`].
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::Validation`] if the name is empty or two
    /// steps share a `step_order`.
    pub fn build(self) -> Result<Automation, HookflowError> {
        let created_at = self.created_at.unwrap_or_else(now);
        let automation = Automation {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            is_active: self.is_active.unwrap_or(true),
            trigger: self.trigger.unwrap_or_default(),
            steps: StepSequence::try_from(self.steps)?,
            created_at,
            updated_at: created_at,
        };
        automation.validate()?;
        Ok(automation)
    }
}
