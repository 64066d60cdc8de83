//! Webhook dispatcher: one timed attempt, or a bounded series of them.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use hookflow_domain::dispatch::{DispatchError, DispatchFailure, DispatchRequest, DispatchResponse};
use hookflow_domain::error::ConfigurationError;
use hookflow_domain::retry::RetryPolicy;
use hookflow_domain::webhook::Webhook;

use crate::ports::HttpClient;

/// Result of [`WebhookDispatcher::dispatch_with_retry`].
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Requests actually sent (zero when the webhook was never dispatched).
    pub attempts: u32,
    pub result: Result<DispatchResponse, DispatchFailure>,
}

/// Sends webhook payloads through an [`HttpClient`].
pub struct WebhookDispatcher<H> {
    client: H,
}

impl<H: HttpClient> WebhookDispatcher<H> {
    pub fn new(client: H) -> Self {
        Self { client }
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &H {
        &self.client
    }

    /// One attempt under the webhook's timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchFailure::Configuration`] for an inactive webhook
    /// (nothing is sent) and [`DispatchFailure::Dispatch`] for a timeout,
    /// network error or non-2xx response.
    pub async fn dispatch(
        &self,
        webhook: &Webhook,
        payload: String,
    ) -> Result<DispatchResponse, DispatchFailure> {
        if !webhook.is_active {
            return Err(ConfigurationError::WebhookInactive(webhook.id).into());
        }
        Ok(self
            .attempt(DispatchRequest::for_webhook(webhook, payload))
            .await?)
    }

    /// Dispatch up to `policy.max_attempts()` times, waiting the fixed delay
    /// in between.
    ///
    /// The wait races `cancel`; a cancelled wait ends the series with
    /// [`DispatchFailure::Cancelled`]. An inactive webhook is never sent or
    /// retried.
    pub async fn dispatch_with_retry(
        &self,
        webhook: &Webhook,
        payload: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        if !webhook.is_active {
            return DispatchOutcome {
                attempts: 0,
                result: Err(ConfigurationError::WebhookInactive(webhook.id).into()),
            };
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            let request = DispatchRequest::for_webhook(webhook, payload.to_owned());
            let err = match self.attempt(request).await {
                Ok(response) => {
                    return DispatchOutcome {
                        attempts,
                        result: Ok(response),
                    };
                }
                Err(err) => err,
            };

            if !policy.allows_another(attempts) {
                return DispatchOutcome {
                    attempts,
                    result: Err(err.into()),
                };
            }

            tracing::warn!(
                webhook_id = %webhook.id,
                attempt = attempts,
                max_attempts = policy.max_attempts(),
                error = %err,
                "webhook attempt failed, retrying"
            );
            tokio::select! {
                () = cancel.cancelled() => {
                    return DispatchOutcome {
                        attempts,
                        result: Err(DispatchFailure::Cancelled),
                    };
                }
                () = tokio::time::sleep(policy.fixed_delay()) => {}
            }
        }
    }

    async fn attempt(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let timeout = request.timeout;
        let started = Instant::now();
        let mut response = tokio::time::timeout(timeout, self.client.send(request))
            .await
            .map_err(|_| DispatchError::Timeout(timeout))??;
        response.latency = started.elapsed();

        if response.is_success() {
            Ok(response)
        } else {
            Err(DispatchError::Http {
                status_code: response.status_code,
                body: response.body,
            })
        }
    }
}
