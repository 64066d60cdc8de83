//! Automation service: use-cases for managing automations and their steps.

use hookflow_domain::automation::{Automation, Step};
use hookflow_domain::error::{HookflowError, NotFoundError};
use hookflow_domain::id::{AutomationId, StepId};
use hookflow_domain::time::now;

use crate::ports::AutomationRepository;

/// Application service for automation CRUD and step arrangement.
pub struct AutomationService<R> {
    repo: R,
}

impl<R: AutomationRepository> AutomationService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Create a new automation after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, automation), fields(automation_name = %automation.name))]
    pub async fn create_automation(
        &self,
        automation: Automation,
    ) -> Result<Automation, HookflowError> {
        automation.validate()?;
        self.repo.create(automation).await
    }

    /// Look up an automation by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] when no automation with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_automation(&self, id: AutomationId) -> Result<Automation, HookflowError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_automations(&self) -> Result<Vec<Automation>, HookflowError> {
        self.repo.get_all().await
    }

    /// Replace an existing automation, steps included.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] for an unknown automation,
    /// [`HookflowError::Validation`] if invariants fail, or a storage error.
    #[tracing::instrument(skip(self, automation), fields(automation_id = %automation.id))]
    pub async fn update_automation(
        &self,
        mut automation: Automation,
    ) -> Result<Automation, HookflowError> {
        let existing = self.get_automation(automation.id).await?;
        automation.created_at = existing.created_at;
        automation.updated_at = now();
        automation.validate()?;
        self.repo.update(automation).await
    }

    /// Delete an automation and its steps.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_automation(&self, id: AutomationId) -> Result<(), HookflowError> {
        self.repo.delete(id).await
    }

    /// Append a step to an automation.
    ///
    /// A step without an order (`0`) is placed after the current last step.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] for an unknown automation,
    /// [`HookflowError::Validation`] when the order is taken or no order is
    /// left, or a storage error.
    #[tracing::instrument(skip(self, step), fields(webhook_id = %step.webhook_id))]
    pub async fn add_step(
        &self,
        automation_id: AutomationId,
        mut step: Step,
    ) -> Result<Automation, HookflowError> {
        let mut automation = self.get_automation(automation_id).await?;
        step.automation_id = automation_id;
        if step.step_order == 0 {
            step.step_order = automation.steps.next_order()?;
        }
        automation.steps.insert(step)?;
        automation.updated_at = now();
        self.repo.update(automation).await
    }

    /// Remove a step; the remaining steps keep their orders.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] when the automation or the step
    /// does not exist, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_step(
        &self,
        automation_id: AutomationId,
        step_id: StepId,
    ) -> Result<Automation, HookflowError> {
        let mut automation = self.get_automation(automation_id).await?;
        if automation.steps.remove(step_id).is_none() {
            return Err(NotFoundError {
                entity: "Step",
                id: step_id.to_string(),
            }
            .into());
        }
        automation.updated_at = now();
        self.repo.update(automation).await
    }

    /// Renumber the steps `1..=n` in the order given by `step_ids`.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::Validation`] unless `step_ids` lists every
    /// step exactly once, [`HookflowError::NotFound`] for an unknown
    /// automation, or a storage error.
    #[tracing::instrument(skip(self, step_ids), fields(steps = step_ids.len()))]
    pub async fn reorder_steps(
        &self,
        automation_id: AutomationId,
        step_ids: &[StepId],
    ) -> Result<Automation, HookflowError> {
        let mut automation = self.get_automation(automation_id).await?;
        automation.steps.renumber(step_ids)?;
        automation.updated_at = now();
        self.repo.update(automation).await
    }
}
