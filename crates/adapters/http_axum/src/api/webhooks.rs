//! JSON REST handlers for webhooks.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use hookflow_app::ports::{AutomationRepository, ExecutionRecorder, HttpClient, WebhookRepository};
use hookflow_app::services::webhook_service::{WebhookTestRequest, WebhookTestResult};
use hookflow_domain::id::WebhookId;
use hookflow_domain::webhook::{Headers, HttpMethod, PayloadType, Webhook};

use crate::api::{optional_json, parse_id};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating or replacing a webhook.
///
/// Omitted fields take the same defaults as [`Webhook::builder`].
#[derive(Deserialize)]
pub struct WebhookRequest {
    pub name: String,
    pub url: String,
    pub method: Option<HttpMethod>,
    #[serde(default)]
    pub headers: Headers,
    pub payload_type: Option<PayloadType>,
    pub payload_template: Option<String>,
    pub retry_enabled: Option<bool>,
    pub retry_count: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub is_active: Option<bool>,
}

impl WebhookRequest {
    fn into_webhook(self, id: Option<WebhookId>) -> Result<Webhook, ApiError> {
        let mut builder = Webhook::builder()
            .name(self.name)
            .url(self.url)
            .headers(self.headers);

        if let Some(id) = id {
            builder = builder.id(id);
        }
        if let Some(method) = self.method {
            builder = builder.method(method);
        }
        if let Some(payload_type) = self.payload_type {
            builder = builder.payload_type(payload_type);
        }
        if let Some(template) = self.payload_template {
            builder = builder.payload_template(template);
        }
        if self.retry_count.is_some() || self.retry_delay_seconds.is_some() {
            builder = builder.retry(
                self.retry_count.unwrap_or(0),
                self.retry_delay_seconds.unwrap_or(0),
            );
        }
        if let Some(enabled) = self.retry_enabled {
            builder = builder.retry_enabled(enabled);
        }
        if let Some(timeout) = self.timeout_seconds {
            builder = builder.timeout_seconds(timeout);
        }
        if let Some(active) = self.is_active {
            builder = builder.is_active(active);
        }

        Ok(builder.build()?)
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Webhook>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and update endpoints.
pub enum GetResponse {
    Ok(Json<Webhook>),
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
    Created(Json<Webhook>),
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

/// Possible responses from the test endpoint.
///
/// A failed dispatch is still a `200`: the failure is the payload.
pub enum TestResponse {
    Ok(Json<WebhookTestResult>),
}

impl IntoResponse for TestResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/webhooks`
pub async fn list<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
) -> Result<ListResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let webhooks = state.webhook_service.list_webhooks().await?;
    Ok(ListResponse::Ok(Json(webhooks)))
}

/// `GET /api/webhooks/{id}`
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
    let webhook_id: WebhookId = parse_id(&id)?;
    let webhook = state.webhook_service.get_webhook(webhook_id).await?;
    Ok(GetResponse::Ok(Json(webhook)))
}

/// `POST /api/webhooks`
pub async fn create<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Json(req): Json<WebhookRequest>,
) -> Result<CreateResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let webhook = req.into_webhook(None)?;
    let created = state.webhook_service.create_webhook(webhook).await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `PUT /api/webhooks/{id}`
pub async fn update<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
    Json(req): Json<WebhookRequest>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let webhook_id: WebhookId = parse_id(&id)?;
    let webhook = req.into_webhook(Some(webhook_id))?;
    let updated = state.webhook_service.update_webhook(webhook).await?;
    Ok(GetResponse::Ok(Json(updated)))
}

/// `DELETE /api/webhooks/{id}`
///
/// Steps that still reference it fail with a configuration error when run.
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
    let webhook_id: WebhookId = parse_id(&id)?;
    state.webhook_service.delete_webhook(webhook_id).await?;
    Ok(DeleteResponse::NoContent)
}

/// `POST /api/webhooks/{id}/test`
pub async fn test<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<TestResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let webhook_id: WebhookId = parse_id(&id)?;
    let request: WebhookTestRequest = optional_json(&body)?;
    let result = state
        .webhook_service
        .test_webhook(webhook_id, request)
        .await?;
    Ok(TestResponse::Ok(Json(result)))
}
