//! JSON REST handlers for individual executions.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hookflow_app::ports::{AutomationRepository, ExecutionRecorder, HttpClient, WebhookRepository};
use hookflow_domain::error::{HookflowError, TransitionError};
use hookflow_domain::execution::AutomationExecution;
use hookflow_domain::id::ExecutionId;

use crate::api::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Body of an accepted cancellation.
#[derive(Serialize)]
pub struct Cancelled {
    pub execution_id: ExecutionId,
    pub cancelled: bool,
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<AutomationExecution>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the cancel endpoint.
pub enum CancelResponse {
    /// The run was signalled; it records itself `failed` at its next suspension point.
    Accepted(Json<Cancelled>),
}

impl IntoResponse for CancelResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(json) => (StatusCode::ACCEPTED, json).into_response(),
        }
    }
}

/// `GET /api/executions/{id}`
pub async fn get<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let execution_id: ExecutionId = parse_id(&id)?;
    let execution = state.execution_service.get(execution_id).await?;
    Ok(GetResponse::Ok(Json(execution)))
}

/// `POST /api/executions/{id}/cancel`
///
/// Answers `404` for an unknown execution and `409` for one that is no
/// longer running in this process.
pub async fn cancel<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
) -> Result<CancelResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let execution_id: ExecutionId = parse_id(&id)?;
    if state.engine.cancel(execution_id) {
        return Ok(CancelResponse::Accepted(Json(Cancelled {
            execution_id,
            cancelled: true,
        })));
    }

    let execution = state.execution_service.get(execution_id).await?;
    let err = if execution.is_terminal() {
        TransitionError::AlreadyTerminal(execution_id)
    } else {
        TransitionError::NotRunning(execution_id)
    };
    Err(HookflowError::from(err).into())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use hookflow_domain::id::ExecutionId;

    use crate::testing::{TestApp, read_json};

    #[tokio::test]
    async fn should_fetch_recorded_execution() {
        let app = TestApp::new().await;
        app.client.reply(200, "ok");
        let automation = app.create_automation(json!({"name": "Empty"})).await;
        let summary = app
            .post_json(
                &format!(
                    "/api/automations/{}/execute",
                    automation["id"].as_str().unwrap()
                ),
                &json!({"source": "test"}),
            )
            .await;

        let uri = format!(
            "/api/executions/{}",
            summary["execution_id"].as_str().unwrap()
        );
        let execution = app.get_json(&uri).await;

        assert_eq!(execution["status"], "completed");
        assert_eq!(execution["trigger_data"]["source"], "test");
        assert_eq!(execution["total_steps"], 0);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_execution() {
        let app = TestApp::new().await;
        let uri = format!("/api/executions/{}", ExecutionId::new());

        let response = app
            .router()
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_return_not_found_when_cancelling_unknown_execution() {
        let app = TestApp::new().await;
        let uri = format!("/api/executions/{}/cancel", ExecutionId::new());

        let response = app
            .router()
            .oneshot(Request::post(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_return_conflict_when_cancelling_finished_execution() {
        let app = TestApp::new().await;
        let automation = app.create_automation(json!({"name": "Empty"})).await;
        let summary = app
            .post_json(
                &format!(
                    "/api/automations/{}/execute",
                    automation["id"].as_str().unwrap()
                ),
                &json!({}),
            )
            .await;
        let uri = format!(
            "/api/executions/{}/cancel",
            summary["execution_id"].as_str().unwrap()
        );

        let response = app
            .router()
            .oneshot(Request::post(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("already terminal"));
    }

    #[tokio::test]
    async fn should_accept_cancellation_of_delayed_execution() {
        let app = TestApp::new().await;
        let hook = app
            .create_webhook(json!({"name": "crm", "url": "https://crm.example.com"}))
            .await;
        let automation = app
            .create_automation(json!({
                "name": "Slow",
                "steps": [{"webhook_id": hook["id"], "delay_seconds": 3600}]
            }))
            .await;
        let automation_id = automation["id"].as_str().unwrap().parse().unwrap();
        let handle = app
            .state
            .engine
            .execute(automation_id, serde_json::Map::new())
            .await
            .unwrap();
        let uri = format!("/api/executions/{}/cancel", handle.execution_id);

        let response = app
            .router()
            .oneshot(Request::post(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let execution = handle.wait().await.unwrap();
        assert_eq!(
            execution.error_message.as_deref(),
            Some(hookflow_domain::execution::CANCELLED_MESSAGE)
        );
        assert!(app.client.bodies().is_empty());
    }
}
