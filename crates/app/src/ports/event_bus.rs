//! Event bus port: publish execution progress to live observers.

use std::future::Future;

use hookflow_domain::error::HookflowError;
use hookflow_domain::event::ExecutionEvent;

/// Publishes execution events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: ExecutionEvent)
    -> impl Future<Output = Result<(), HookflowError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: ExecutionEvent,
    ) -> impl Future<Output = Result<(), HookflowError>> + Send {
        (**self).publish(event)
    }
}
