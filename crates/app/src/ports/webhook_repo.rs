//! Webhook repository port.

use std::future::Future;

use hookflow_domain::error::HookflowError;
use hookflow_domain::id::WebhookId;
use hookflow_domain::webhook::Webhook;

/// Repository for persisting and querying [`Webhook`]s.
pub trait WebhookRepository {
    fn create(
        &self,
        webhook: Webhook,
    ) -> impl Future<Output = Result<Webhook, HookflowError>> + Send;

    fn get_by_id(
        &self,
        id: WebhookId,
    ) -> impl Future<Output = Result<Option<Webhook>, HookflowError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Webhook>, HookflowError>> + Send;

    fn update(

        &self,

        webhook: Webhook,

    ) -> impl Future<Output = Result<Webhook, HookflowError>> + Send;

    fn delete(&self, id: WebhookId) -> impl Future<Output = Result<(), HookflowError>> + Send;
}

impl<T: WebhookRepository + Send + Sync> WebhookRepository for std::sync::Arc<T> {
    fn create(
        &self,
        webhook: Webhook,
    ) -> impl Future<Output = Result<Webhook, HookflowError>> + Send {
        (**self).create(webhook)
    }

    fn get_by_id(
        &self,
        id: WebhookId,
    ) -> impl Future<Output = Result<Option<Webhook>, HookflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Webhook>, HookflowError>> + Send {
        (**self).get_all()
    }

    fn update(

        &self,

        webhook: Webhook,

    ) -> impl Future<Output = Result<Webhook, HookflowError>> + Send {
        (**self).update(webhook)
    }

    fn delete(&self, id: WebhookId) -> impl Future<Output = Result<(), HookflowError>> + Send {
        (**self).delete(id)
    }
}
