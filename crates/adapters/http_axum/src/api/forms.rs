//! Form submission intake.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hookflow_app::ports::{AutomationRepository, ExecutionRecorder, HttpClient, WebhookRepository};
use hookflow_domain::id::ExecutionId;

use crate::api::trigger_data;
use crate::error::ApiError;
use crate::state::AppState;

/// Executions started by a submission.
#[derive(Serialize)]
pub struct Submitted {
    pub execution_ids: Vec<ExecutionId>,
}

/// Possible responses from the submit endpoint.
pub enum SubmitResponse {
    Accepted(Json<Submitted>),
}

impl IntoResponse for SubmitResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(json) => (StatusCode::ACCEPTED, json).into_response(),
        }
    }
}

/// `POST /api/forms/{form_id}/submissions`
///
/// Runs continue in the background; follow them through
/// `/api/executions/{id}` or the SSE stream.
pub async fn submit<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(form_id): Path<String>,
    body: Bytes,
) -> Result<SubmitResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let data = trigger_data(&body)?;
    let handles = state
        .engine
        .execute_form_submission(&form_id, data)
        .await?;
    let execution_ids = handles.iter().map(|h| h.execution_id).collect();
    Ok(SubmitResponse::Accepted(Json(Submitted { execution_ids })))
}
