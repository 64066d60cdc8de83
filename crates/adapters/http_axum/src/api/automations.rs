//! JSON REST handlers for automations, their steps and their executions.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hookflow_app::ports::{AutomationRepository, ExecutionRecorder, HttpClient, WebhookRepository};
use hookflow_domain::automation::{Automation, Step, Trigger};
use hookflow_domain::error::ValidationError;
use hookflow_domain::execution::{AutomationExecution, ExecutionStatus};
use hookflow_domain::id::{AutomationId, ExecutionId, StepId, WebhookId};

use crate::api::{parse_id, trigger_data};
use crate::error::ApiError;
use crate::state::AppState;

/// A step as submitted by clients.
///
/// Without a `step_order` the step goes after the highest order seen so far.
#[derive(Deserialize)]
pub struct StepRequest {
    pub id: Option<StepId>,
    pub webhook_id: WebhookId,
    pub step_order: Option<u32>,
    pub condition_config: Option<Value>,
    pub delay_seconds: Option<u64>,
    pub retry_on_failure: Option<bool>,
    pub continue_on_failure: Option<bool>,
}

impl StepRequest {
    fn into_step(self, automation_id: AutomationId, step_order: u32) -> Step {
        let mut builder = Step::builder(automation_id, self.webhook_id).step_order(step_order);
        if let Some(id) = self.id {
            builder = builder.id(id);
        }
        if let Some(config) = self.condition_config {
            builder = builder.condition(config);
        }
        if let Some(delay) = self.delay_seconds {
            builder = builder.delay_seconds(delay);
        }
        if let Some(retry) = self.retry_on_failure {
            builder = builder.retry_on_failure(retry);
        }
        if let Some(cont) = self.continue_on_failure {
            builder = builder.continue_on_failure(cont);
        }
        builder.build()
    }
}

/// Request body for creating or replacing an automation.
#[derive(Deserialize)]
pub struct AutomationRequest {
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub steps: Vec<StepRequest>,
}

impl AutomationRequest {
    fn into_automation(self, id: Option<AutomationId>) -> Result<Automation, ApiError> {
        let id = id.unwrap_or_default();
        let mut builder = Automation::builder().id(id).name(self.name);

        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(active) = self.is_active {
            builder = builder.is_active(active);
        }
        if let Some(trigger) = self.trigger {
            builder = builder.trigger(trigger);
        }

        let mut highest: u32 = 0;
        for step in self.steps {
            let order = match step.step_order {
                Some(order) => order,
                None => highest
                    .checked_add(1)
                    .ok_or(ValidationError::StepOrderExhausted(highest))?,
            };
            highest = highest.max(order);
            builder = builder.step(step.into_step(id, order));
        }

        Ok(builder.build()?)
    }
}

/// Request body for `PUT /api/automations/{id}/steps/order`.
#[derive(Deserialize)]
pub struct ReorderRequest {
    pub step_ids: Vec<StepId>,
}

/// Query string of the executions listing.
#[derive(Deserialize)]
pub struct ExecutionsQuery {
    pub limit: Option<u32>,
}

/// Outcome of a synchronous execution.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub success: bool,
    pub execution_id: ExecutionId,
    pub completed_steps: u32,
    pub total_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<AutomationExecution> for ExecutionSummary {
    fn from(execution: AutomationExecution) -> Self {
        Self {
            success: execution.status == ExecutionStatus::Completed,
            execution_id: execution.id,
            completed_steps: execution.completed_steps,
            total_steps: execution.total_steps,
            error_message: execution.error_message,
        }
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Automation>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from endpoints returning a single automation.
pub enum GetResponse {
    Ok(Json<Automation>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Automation>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Possible responses from the execute endpoint.
///
/// A run that ends `failed` is still a `200`; `success` carries the outcome.
pub enum ExecuteResponse {
    Ok(Json<ExecutionSummary>),
}

impl IntoResponse for ExecuteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the executions endpoint.
pub enum ExecutionsResponse {
    Ok(Json<Vec<AutomationExecution>>),
}

impl IntoResponse for ExecutionsResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/automations`
pub async fn list<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
) -> Result<ListResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automations = state.automation_service.list_automations().await?;
    Ok(ListResponse::Ok(Json(automations)))
}

/// `GET /api/automations/{id}`
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
    let automation_id: AutomationId = parse_id(&id)?;
    let automation = state
        .automation_service
        .get_automation(automation_id)
        .await?;
    Ok(GetResponse::Ok(Json(automation)))
}

/// `POST /api/automations`
pub async fn create<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Json(req): Json<AutomationRequest>,
) -> Result<CreateResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automation = req.into_automation(None)?;
    let created = state
        .automation_service
        .create_automation(automation)
        .await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `PUT /api/automations/{id}`
pub async fn update<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
    Json(req): Json<AutomationRequest>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let automation = req.into_automation(Some(automation_id))?;
    let updated = state
        .automation_service
        .update_automation(automation)
        .await?;
    Ok(GetResponse::Ok(Json(updated)))
}

/// `DELETE /api/automations/{id}`
///
/// Recorded executions are kept.
pub async fn delete<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    state
        .automation_service
        .delete_automation(automation_id)
        .await?;
    Ok(DeleteResponse::NoContent)
}

/// `POST /api/automations/{id}/steps`
pub async fn add_step<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
    Json(req): Json<StepRequest>,
) -> Result<CreateResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    // order 0 lets the service pick the next free slot
    let order = req.step_order.unwrap_or(0);
    let step = req.into_step(automation_id, order);
    let updated = state
        .automation_service
        .add_step(automation_id, step)
        .await?;
    Ok(CreateResponse::Created(Json(updated)))
}

/// `DELETE /api/automations/{id}/steps/{step_id}`
pub async fn remove_step<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path((id, step_id)): Path<(String, String)>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let step_id: StepId = parse_id(&step_id)?;
    let updated = state
        .automation_service
        .remove_step(automation_id, step_id)
        .await?;
    Ok(GetResponse::Ok(Json(updated)))
}

/// `PUT /api/automations/{id}/steps/order`
pub async fn reorder_steps<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
    Json(req): Json<ReorderRequest>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let updated = state
        .automation_service
        .reorder_steps(automation_id, &req.step_ids)
        .await?;
    Ok(GetResponse::Ok(Json(updated)))
}

/// `POST /api/automations/{id}/execute`
///
/// The body, if any, is the trigger data object.
pub async fn execute<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ExecuteResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let data = trigger_data(&body)?;
    let handle = state.engine.execute(automation_id, data).await?;
    let execution = handle.wait().await?;
    Ok(ExecuteResponse::Ok(Json(execution.into())))
}

/// `GET /api/automations/{id}/executions?limit=20`
pub async fn executions<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
    Query(query): Query<ExecutionsQuery>,
) -> Result<ExecutionsResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let executions = state
        .execution_service
        .list(automation_id, query.limit)
        .await?;
    Ok(ExecutionsResponse::Ok(Json(executions)))
}
