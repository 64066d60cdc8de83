//! Automation repository port: persistence for automations and their steps.

use std::future::Future;

use hookflow_domain::automation::Automation;
use hookflow_domain::error::HookflowError;
use hookflow_domain::id::AutomationId;

/// Repository for persisting and querying [`Automation`]s.
///
/// Steps are owned by their automation: they are written with it, read
/// back with it and deleted with it.
pub trait AutomationRepository {
    /// Create a new automation (and its steps) in storage.
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HookflowError>> + Send;

    /// Get an automation with its steps by its unique identifier.
    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HookflowError>> + Send;

    /// Get all automations.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, HookflowError>> + Send;

    /// Get all active automations.
    fn get_active(&self) -> impl Future<Output = Result<Vec<Automation>, HookflowError>> + Send;

    /// Replace an existing automation, including its full step list.
    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HookflowError>> + Send;

    /// Delete an automation and its steps.
    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), HookflowError>> + Send;
}

impl<T: AutomationRepository + Send + Sync> AutomationRepository for std::sync::Arc<T> {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HookflowError>> + Send {
        (**self).create(automation)
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HookflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, HookflowError>> + Send {
        (**self).get_all()
    }

    fn get_active(&self) -> impl Future<Output = Result<Vec<Automation>, HookflowError>> + Send {
        (**self).get_active()
    }

    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HookflowError>> + Send {
        (**self).update(automation)
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), HookflowError>> + Send {
        (**self).delete(id)
    }
}
