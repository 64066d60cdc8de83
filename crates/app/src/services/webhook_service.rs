//! Webhook service: CRUD plus ad-hoc test dispatches.

use serde::{Deserialize, Serialize};

use hookflow_domain::context::{Context, TriggerData};
use hookflow_domain::dispatch::DispatchFailure;
use hookflow_domain::error::{ConfigurationError, HookflowError, NotFoundError};
use hookflow_domain::execution::truncate_body;
use hookflow_domain::id::WebhookId;
use hookflow_domain::time::now;
use hookflow_domain::webhook::Webhook;

use crate::dispatcher::WebhookDispatcher;
use crate::payload_renderer::render_payload;
use crate::ports::{HttpClient, WebhookRepository};

/// Input of [`WebhookService::test_webhook`].
///
/// An explicit `payload` is sent as is; otherwise the webhook's template is
/// rendered against `trigger_data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookTestRequest {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub trigger_data: Option<TriggerData>,
}

/// Outcome of a single test dispatch.
///
/// `response_body` is capped like a recorded step's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTestResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub response_time_ms: u64,
}

/// Application service for webhook definitions.
pub struct WebhookService<R, H> {
    repo: R,
    dispatcher: WebhookDispatcher<H>,
}

impl<R: WebhookRepository, H: HttpClient> WebhookService<R, H> {
    /// Create a new service backed by the given repository and HTTP client.
    pub fn new(repo: R, client: H) -> Self {
        Self {
            repo,
            dispatcher: WebhookDispatcher::new(client),
        }
    }

    /// Create a new webhook after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, webhook), fields(webhook_name = %webhook.name))]
    pub async fn create_webhook(&self, webhook: Webhook) -> Result<Webhook, HookflowError> {
        webhook.validate()?;
        self.repo.create(webhook).await
    }

    /// Look up a webhook by id.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] when no webhook with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_webhook(&self, id: WebhookId) -> Result<Webhook, HookflowError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Webhook",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all webhooks.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_webhooks(&self) -> Result<Vec<Webhook>, HookflowError> {
        self.repo.get_all().await
    }

    /// Replace an existing webhook.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] for an unknown webhook,
    /// [`HookflowError::Validation`] if invariants fail, or a storage error.
    #[tracing::instrument(skip(self, webhook), fields(webhook_id = %webhook.id))]
    pub async fn update_webhook(&self, mut webhook: Webhook) -> Result<Webhook, HookflowError> {
        let existing = self.get_webhook(webhook.id).await?;
        webhook.created_at = existing.created_at;
        webhook.updated_at = now();
        webhook.validate()?;
        self.repo.update(webhook).await
    }

    /// Delete a webhook by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_webhook(&self, id: WebhookId) -> Result<(), HookflowError> {
        self.repo.delete(id).await
    }

    /// Send one request to the webhook, without retries, and report what happened.
    ///
    /// Dispatch failures are part of the result, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`HookflowError::NotFound`] for an unknown webhook and
    /// [`HookflowError::Configuration`] for an inactive one.
    #[tracing::instrument(skip(self, request))]
    pub async fn test_webhook(
        &self,
        id: WebhookId,
        request: WebhookTestRequest,
    ) -> Result<WebhookTestResult, HookflowError> {
        let webhook = self.get_webhook(id).await?;
        if !webhook.is_active {
            return Err(ConfigurationError::WebhookInactive(id).into());
        }

        let payload = match request.payload {
            Some(payload) => payload,
            None => {
                let ctx = request
                    .trigger_data
                    .as_ref()
                    .map(Context::from_trigger)
                    .unwrap_or_default();
                render_payload(&webhook, &ctx)
            }
        };

        let started = tokio::time::Instant::now();
        let result = self.dispatcher.dispatch(&webhook, payload).await;
        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        Ok(match result {
            Ok(response) => WebhookTestResult {
                success: true,
                status_code: Some(response.status_code),
                response_body: Some(truncate_body(response.body)),
                error_message: None,
                response_time_ms,
            },
            Err(failure) => {
                tracing::warn!(error = %failure, "webhook test failed");
                let (status_code, response_body) = match &failure {
                    DispatchFailure::Dispatch(err) => {
                        (err.status_code(), err.body().map(|body| truncate_body(body.to_owned())))
                    }
                    DispatchFailure::Configuration(_) | DispatchFailure::Cancelled => (None, None),
                };
                WebhookTestResult {
                    success: false,
                    status_code,
                    response_body,
                    error_message: Some(failure.to_string()),
                    response_time_ms,
                }
            }
        })
    }
}
