//! End-to-end tests for the full hookflowd stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, real repos,
//! real reqwest client, real engine and services, real axum router) and
//! exercises the HTTP layer via `tower::ServiceExt::oneshot`; no TCP port is
//! bound for the API. Webhook targets are `wiremock` servers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use hookflow_adapter_http_axum::router;
use hookflow_adapter_http_axum::state::AppState;
use hookflow_adapter_storage_sqlite_sqlx::{
    Config, SqliteAutomationRepository, SqliteExecutionRecorder, SqliteWebhookRepository,
};
use hookflow_app::event_bus::InProcessEventBus;
use hookflow_app::execution_engine::ExecutionEngine;
use hookflow_app::services::automation_service::AutomationService;
use hookflow_app::services::execution_service::ExecutionService;
use hookflow_app::services::webhook_service::WebhookService;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a fully-wired router backed by an in-memory `SQLite` database.
async fn app() -> axum::Router {
    let db = Config::new("sqlite::memory:")
        .build()
        .await
        .expect("in-memory database should initialise");
    let pool = db.pool().clone();

    let automation_repo = SqliteAutomationRepository::new(pool.clone());
    let webhook_repo = SqliteWebhookRepository::new(pool.clone());
    let recorder = SqliteExecutionRecorder::new(pool);
    let client = Arc::new(
        hookflow_adapter_http_reqwest::Config::default()
            .build()
            .expect("http client should build"),
    );
    let event_bus = Arc::new(InProcessEventBus::new(256));

    let engine = ExecutionEngine::new(
        automation_repo.clone(),
        webhook_repo.clone(),
        recorder.clone(),
        Arc::clone(&client),
        Arc::clone(&event_bus),
    );
    let state = AppState::new(
        AutomationService::new(automation_repo),
        WebhookService::new(webhook_repo, client),
        ExecutionService::new(recorder),
        engine,
        event_bus,
    );

    router::build(state)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

async fn create_webhook(app: &axum::Router, body: Value) -> String {
    let (status, created) = send(app, "POST", "/api/webhooks", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["id"].as_str().unwrap().to_string()
}

async fn create_automation(app: &axum::Router, body: Value) -> String {
    let (status, created) = send(app, "POST", "/api/automations", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_stop_after_second_step_exhausts_its_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/billing"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(2)
        .mount(&server)
        .await;

    let app = app().await;
    let leads = create_webhook(
        &app,
        json!({"name": "leads", "url": format!("{}/leads", server.uri())}),
    )
    .await;
    let billing = create_webhook(
        &app,
        json!({
            "name": "billing",
            "url": format!("{}/billing", server.uri()),
            "retry_count": 1,
            "retry_delay_seconds": 0
        }),
    )
    .await;
    let automation = create_automation(
        &app,
        json!({
            "name": "Lead intake",
            "steps": [{"webhook_id": leads}, {"webhook_id": billing}]
        }),
    )
    .await;

    let (status, summary) = send(
        &app,
        "POST",
        &format!("/api/automations/{automation}/execute"),
        Some(json!({"name": "Ada"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["success"], false);
    assert_eq!(summary["completed_steps"], 1);
    assert_eq!(summary["total_steps"], 2);
    assert!(
        summary["error_message"]
            .as_str()
            .unwrap()
            .contains("step 2")
    );

    let (status, history) = send(
        &app,
        "GET",
        &format!("/api/automations/{automation}/executions"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let execution = &history[0];
    assert_eq!(execution["status"], "failed");
    assert!(execution["completed_at"].is_string());
    assert_eq!(execution["steps"][0]["status"], "succeeded");
    assert_eq!(execution["steps"][0]["response_body"], "stored");
    assert_eq!(execution["steps"][1]["status"], "failed");
    assert_eq!(execution["steps"][1]["attempt_count"], 2);
    assert_eq!(execution["steps"][1]["http_status"], 500);
}

#[tokio::test]
async fn should_render_payload_from_trigger_and_previous_step() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"lead_id": 42})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/crm"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let app = app().await;
    let leads = create_webhook(
        &app,
        json!({
            "name": "leads",
            "url": format!("{}/leads", server.uri()),
            "payload_template": "{\"email\": \"{{email}}\"}"
        }),
    )
    .await;
    let crm = create_webhook(
        &app,
        json!({
            "name": "crm",
            "url": format!("{}/crm", server.uri()),
            "method": "PUT",
            "headers": [{"key": "X-Api-Key", "value": "s3cret"}],
            "payload_template": "{\"lead\": {{steps.1.response.lead_id}}, \"email\": \"{{email}}\", \"phone\": \"{{phone}}\"}"
        }),
    )
    .await;
    let automation = create_automation(
        &app,
        json!({
            "name": "Lead intake",
            "steps": [{"webhook_id": leads}, {"webhook_id": crm}]
        }),
    )
    .await;

    let (_, summary) = send(
        &app,
        "POST",
        &format!("/api/automations/{automation}/execute"),
        Some(json!({"email": "ada@example.com"})),
    )
    .await;
    assert_eq!(summary["success"], true, "{summary}");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        String::from_utf8_lossy(&requests[0].body),
        r#"{"email": "ada@example.com"}"#
    );
    assert_eq!(
        String::from_utf8_lossy(&requests[1].body),
        r#"{"lead": 42, "email": "ada@example.com", "phone": ""}"#
    );
    assert_eq!(requests[1].headers["x-api-key"], "s3cret");
    assert_eq!(requests[1].headers["content-type"], "application/json");
}

#[tokio::test]
async fn should_skip_conditional_step_and_continue_past_tolerated_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vip"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let app = app().await;
    let flaky = create_webhook(
        &app,
        json!({"name": "flaky", "url": format!("{}/flaky", server.uri())}),
    )
    .await;
    let vip = create_webhook(
        &app,
        json!({"name": "vip", "url": format!("{}/vip", server.uri())}),
    )
    .await;
    let last = create_webhook(
        &app,
        json!({"name": "final", "url": format!("{}/final", server.uri())}),
    )
    .await;
    let automation = create_automation(
        &app,
        json!({
            "name": "Tolerant",
            "steps": [
                {"webhook_id": flaky, "continue_on_failure": true},
                {
                    "webhook_id": vip,
                    "condition_config": {
                        "version": 1,
                        "rule": {"op": "equals", "field": "tier", "value": "vip"}
                    }
                },
                {"webhook_id": last}
            ]
        }),
    )
    .await;

    let (_, summary) = send(
        &app,
        "POST",
        &format!("/api/automations/{automation}/execute"),
        None,
    )
    .await;

    assert_eq!(summary["success"], true, "{summary}");
    assert_eq!(summary["completed_steps"], 1);
    assert_eq!(summary["total_steps"], 3);
    let (_, execution) = send(
        &app,
        "GET",
        &format!("/api/executions/{}", summary["execution_id"].as_str().unwrap()),
        None,
    )
    .await;
    let statuses: Vec<&str> = execution["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["failed", "skipped", "succeeded"]);
    assert_eq!(execution["steps"][1]["attempt_count"], 0);
}

#[tokio::test]
async fn should_fail_step_on_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let app = app().await;
    let slow = create_webhook(
        &app,
        json!({"name": "slow", "url": server.uri(), "timeout_seconds": 1}),
    )
    .await;
    let automation = create_automation(
        &app,
        json!({"name": "Impatient", "steps": [{"webhook_id": slow}]}),
    )
    .await;

    let (_, summary) = send(
        &app,
        "POST",
        &format!("/api/automations/{automation}/execute"),
        None,
    )
    .await;

    assert_eq!(summary["success"], false);
    assert!(
        summary["error_message"]
            .as_str()
            .unwrap()
            .contains("timed out"),
        "{summary}"
    );
}

#[tokio::test]
async fn should_fail_step_without_dispatch_when_webhook_is_inactive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = app().await;
    let paused = create_webhook(
        &app,
        json!({"name": "paused", "url": server.uri(), "is_active": false}),
    )
    .await;
    let automation = create_automation(
        &app,
        json!({"name": "Blocked", "steps": [{"webhook_id": paused}]}),
    )
    .await;

    let (_, summary) = send(
        &app,
        "POST",
        &format!("/api/automations/{automation}/execute"),
        None,
    )
    .await;
    assert_eq!(summary["success"], false);

    let (_, history) = send(
        &app,
        "GET",
        &format!("/api/automations/{automation}/executions?limit=1"),
        None,
    )
    .await;
    assert_eq!(history[0]["steps"][0]["attempt_count"], 0);
    assert!(
        history[0]["steps"][0]["error"]
            .as_str()
            .unwrap()
            .contains("inactive")
    );
}

// ---------------------------------------------------------------------------
// Forms and webhook tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_run_form_automation_in_background() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let app = app().await;
    let hook = create_webhook(
        &app,
        json!({
            "name": "signup",
            "url": format!("{}/signup", server.uri()),
            "payload_template": "{{email}}"
        }),
    )
    .await;
    create_automation(
        &app,
        json!({
            "name": "Signup",
            "trigger": {"type": "form_submission", "form_id": "signup"},
            "steps": [{"webhook_id": hook}]
        }),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/forms/signup/submissions",
        Some(json!({"email": "grace@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let execution_id = body["execution_ids"][0].as_str().unwrap().to_string();

    let mut execution = Value::Null;
    for _ in 0..100 {
        (_, execution) = send(&app, "GET", &format!("/api/executions/{execution_id}"), None).await;
        if execution["status"] == "completed" || execution["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(execution["status"], "completed");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(String::from_utf8_lossy(&requests[0].body), "grace@example.com");
}

#[tokio::test]
async fn should_test_webhook_once_and_report_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad lead"))
        .expect(1)
        .mount(&server)
        .await;

    let app = app().await;
    let hook = create_webhook(
        &app,
        json!({"name": "strict", "url": server.uri(), "retry_count": 5}),
    )
    .await;

    let (status, result) = send(
        &app,
        "POST",
        &format!("/api/webhooks/{hook}/test"),
        Some(json!({"payload": "{}"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["success"], false);
    assert_eq!(result["status_code"], 422);
    assert_eq!(result["response_body"], "bad lead");
    assert!(result["response_time_ms"].is_u64());
}

#[tokio::test]
async fn should_keep_executions_after_automation_is_deleted() {
    let app = app().await;
    let automation = create_automation(&app, json!({"name": "Short-lived"})).await;
    let (_, summary) = send(
        &app,
        "POST",
        &format!("/api/automations/{automation}/execute"),
        None,
    )
    .await;

    let (status, _) = send(&app, "DELETE", &format!("/api/automations/{automation}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, execution) = send(
        &app,
        "GET",
        &format!("/api/executions/{}", summary["execution_id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(execution["status"], "completed");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/automations/{automation}/execute"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
