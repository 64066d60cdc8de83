//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod automations;
#[allow(clippy::missing_errors_doc)]
pub mod executions;
#[allow(clippy::missing_errors_doc)]
pub mod forms;
pub mod sse;
#[allow(clippy::missing_errors_doc)]
pub mod webhooks;

use std::str::FromStr;

use axum::Router;
use axum::body::Bytes;
use axum::routing::{delete, get, post, put};
use serde::de::DeserializeOwned;
use serde_json::Value;

use hookflow_app::ports::{AutomationRepository, ExecutionRecorder, HttpClient, WebhookRepository};
use hookflow_domain::context::TriggerData;
use hookflow_domain::error::ValidationError;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<AR, WR, ER, H>() -> Router<AppState<AR, WR, ER, H>>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    Router::new()
        // Webhooks
        .route(
            "/webhooks",
            get(webhooks::list::<AR, WR, ER, H>).post(webhooks::create::<AR, WR, ER, H>),
        )
        .route(
            "/webhooks/{id}",
            get(webhooks::get::<AR, WR, ER, H>)
                .put(webhooks::update::<AR, WR, ER, H>)
                .delete(webhooks::delete::<AR, WR, ER, H>),
        )
        .route(
            "/webhooks/{id}/test",
            post(webhooks::test::<AR, WR, ER, H>),
        )
        // Automations
        .route(
            "/automations",
            get(automations::list::<AR, WR, ER, H>).post(automations::create::<AR, WR, ER, H>),
        )
        .route(
            "/automations/{id}",
            get(automations::get::<AR, WR, ER, H>)
                .put(automations::update::<AR, WR, ER, H>)
                .delete(automations::delete::<AR, WR, ER, H>),
        )
        .route(
            "/automations/{id}/steps",
            post(automations::add_step::<AR, WR, ER, H>),
        )
        .route(
            "/automations/{id}/steps/order",
            put(automations::reorder_steps::<AR, WR, ER, H>),
        )
        .route(
            "/automations/{id}/steps/{step_id}",
            delete(automations::remove_step::<AR, WR, ER, H>),
        )
        .route(
            "/automations/{id}/execute",
            post(automations::execute::<AR, WR, ER, H>),
        )
        .route(
            "/automations/{id}/executions",
            get(automations::executions::<AR, WR, ER, H>),
        )
        // Executions
        .route("/executions/stream", get(sse::stream::<AR, WR, ER, H>))
        .route("/executions/{id}", get(executions::get::<AR, WR, ER, H>))
        .route(
            "/executions/{id}/cancel",
            post(executions::cancel::<AR, WR, ER, H>),
        )
        // Forms
        .route(
            "/forms/{form_id}/submissions",
            post(forms::submit::<AR, WR, ER, H>),
        )
}

/// Parse an identifier taken from the request path.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ValidationError> {
    T::from_str(raw).map_err(|_| ValidationError::InvalidId(raw.to_string()))
}

/// Deserialize an optional JSON body, falling back to `T::default()` when empty.
pub(crate) fn optional_json<T>(body: &Bytes) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| ValidationError::MalformedBody(err.to_string()))
}

/// Read trigger data from an optional JSON object body.
///
/// An empty body is an empty object.
pub(crate) fn trigger_data(body: &Bytes) -> Result<TriggerData, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TriggerData::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(TriggerData::new()),
        Ok(_) => Err(ValidationError::TriggerDataNotObject),
        Err(err) => Err(ValidationError::MalformedBody(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookflow_domain::id::WebhookId;

    #[test]
    fn should_treat_empty_body_as_empty_trigger_data() {
        assert!(trigger_data(&Bytes::new()).unwrap().is_empty());
        assert!(trigger_data(&Bytes::from_static(b"null")).unwrap().is_empty());
    }

    #[test]
    fn should_reject_non_object_trigger_data() {
        let result = trigger_data(&Bytes::from_static(b"[1, 2]"));
        assert_eq!(result, Err(ValidationError::TriggerDataNotObject));
    }

    #[test]
    fn should_report_malformed_json() {
        let result = trigger_data(&Bytes::from_static(b"{oops"));
        assert!(matches!(result, Err(ValidationError::MalformedBody(_))));
    }

    #[test]
    fn should_report_invalid_path_id() {
        let result = parse_id::<WebhookId>("nope");
        assert_eq!(result, Err(ValidationError::InvalidId("nope".into())));
    }
}
