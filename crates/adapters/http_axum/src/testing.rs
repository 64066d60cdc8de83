//! Test harness: the full router over an in-memory `SQLite` database and a
//! scripted HTTP client.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use hookflow_adapter_storage_sqlite_sqlx::{
    Config, SqliteAutomationRepository, SqliteExecutionRecorder, SqliteWebhookRepository,
};
use hookflow_app::event_bus::InProcessEventBus;
use hookflow_app::execution_engine::ExecutionEngine;
use hookflow_app::ports::HttpClient;
use hookflow_app::services::automation_service::AutomationService;
use hookflow_app::services::execution_service::ExecutionService;
use hookflow_app::services::webhook_service::WebhookService;
use hookflow_domain::dispatch::{DispatchError, DispatchRequest, DispatchResponse};

use crate::state::AppState;

/// Answers every request with the same canned response and keeps what was sent.
pub(crate) struct StubClient {
    reply: Mutex<(u16, String)>,
    sent: Mutex<Vec<DispatchRequest>>,
}

impl StubClient {
    fn new() -> Self {
        Self {
            reply: Mutex::new((200, String::new())),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn reply(&self, status: u16, body: &str) {
        *self.reply.lock().unwrap() = (status, body.to_string());
    }

    pub(crate) fn bodies(&self) -> Vec<Option<String>> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.body.clone())
            .collect()
    }
}

impl HttpClient for StubClient {
    fn send(
        &self,
        request: DispatchRequest,
    ) -> impl Future<Output = Result<DispatchResponse, DispatchError>> + Send {
        let (status_code, body) = self.reply.lock().unwrap().clone();
        self.sent.lock().unwrap().push(request);
        async move {
            Ok(DispatchResponse {
                status_code,
                body,
                latency: Duration::from_millis(1),
            })
        }
    }
}

pub(crate) type TestState = AppState<
    SqliteAutomationRepository,
    SqliteWebhookRepository,
    SqliteExecutionRecorder,
    Arc<StubClient>,
>;

pub(crate) struct TestApp {
    pub(crate) state: TestState,
    pub(crate) client: Arc<StubClient>,
}

impl TestApp {
    pub(crate) async fn new() -> Self {
        let db = Config::new("sqlite::memory:").build().await.unwrap();
        let pool = db.pool().clone();
        let automations = SqliteAutomationRepository::new(pool.clone());
        let webhooks = SqliteWebhookRepository::new(pool.clone());
        let recorder = SqliteExecutionRecorder::new(pool);
        let client = Arc::new(StubClient::new());
        let event_bus = Arc::new(InProcessEventBus::new(64));

        let engine = ExecutionEngine::new(
            automations.clone(),
            webhooks.clone(),
            recorder.clone(),
            Arc::clone(&client),
            Arc::clone(&event_bus),
        );
        let state = AppState::new(
            AutomationService::new(automations),
            WebhookService::new(webhooks, Arc::clone(&client)),
            ExecutionService::new(recorder),
            engine,
            event_bus,
        );

        Self { state, client }
    }

    pub(crate) fn router(&self) -> Router {
        crate::router::build(self.state.clone())
    }

    pub(crate) async fn get_json(&self, uri: &str) -> Value {
        let response = self
            .router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        read_json(response).await
    }

    pub(crate) async fn post_json(&self, uri: &str, body: &Value) -> Value {
        let response = self
            .router()
            .oneshot(json_request(Method::POST, uri, body))
            .await
            .unwrap();
        assert!(response.status().is_success(), "POST {uri}");
        read_json(response).await
    }

    pub(crate) async fn create_webhook(&self, body: Value) -> Value {
        self.post_json("/api/webhooks", &body).await
    }

    pub(crate) async fn create_automation(&self, body: Value) -> Value {
        self.post_json("/api/automations", &body).await
    }
}

pub(crate) fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub(crate) async fn read_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
