use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use devops_console::core::config::{DevOpsConfig, ServerConfig};
use devops_console::core::{Adapters, CommandDispatcher, HistoryStore, ToolAvailabilityProbe};
use devops_console::server;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tower::ServiceExt;

fn dispatcher() -> CommandDispatcher {
    CommandDispatcher::new(
        Adapters::new(),
        ToolAvailabilityProbe::default().with_tools(Vec::new()),
    )
}

fn app(dispatcher: CommandDispatcher) -> Router {
    server::router(dispatcher, &ServerConfig::default()).unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_status_and_timestamp() {
    let app = app(dispatcher());
    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert!(body["data"]["timestamp"].is_string());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_commands_lists_catalog() {
    let app = app(dispatcher());
    let (status, body) = call(&app, get("/api/devops/commands")).await;
    assert_eq!(status, StatusCode::OK);

    let commands = body["data"].as_array().unwrap();
    assert_eq!(commands.len(), 21);
    assert_eq!(commands[0]["name"], "sonar-scan");
    assert_eq!(commands[0]["category"], "Code Quality");
    assert!(commands
        .iter()
        .any(|c| c["name"] == "jenkins-trigger" && c["category"] == "CI/CD"));
}

#[tokio::test]
async fn test_execute_returns_command_result() {
    let app = app(dispatcher());
    let request = post_json(
        "/api/devops/execute",
        json!({"command": "help"}).to_string(),
    );
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["command"], "help");
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["output"], "Available commands: 21");
}

#[tokio::test]
async fn test_execute_failure_is_still_ok_status() {
    let app = app(dispatcher());
    let request = post_json(
        "/api/devops/execute",
        json!({"command": "jenkins-jobs", "args": []}).to_string(),
    );
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], false);
    assert_eq!(body["data"]["error"], "Jenkins service not initialized");
}

#[tokio::test]
async fn test_execute_rejects_invalid_body() {
    let app = app(dispatcher());
    for payload in ["not json", "{\"args\": []}"] {
        let (status, body) = call(&app, post_json("/api/devops/execute", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");
    }
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = app(dispatcher());
    let padding = "x".repeat(ServerConfig::default().body_limit_bytes + 1);
    let payload = json!({"command": "help", "args": [padding]}).to_string();
    let (status, body) = call(&app, post_json("/api/devops/execute", payload)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "payload too large");
}

#[tokio::test]
async fn test_history_returns_recent_records() {
    let temp = TempDir::new().unwrap();
    let app = app(dispatcher().with_history(HistoryStore::new(temp.path())));

    for command in ["help", "tool-status", "help"] {
        let request = post_json(
            "/api/devops/execute",
            json!({ "command": command }).to_string(),
        );
        let (status, _) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app, get("/api/devops/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (_, body) = call(&app, get("/api/devops/history?limit=2")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_history_rejects_invalid_limit() {
    let app = app(dispatcher());
    let (status, body) = call(&app, get("/api/devops/history?limit=ten")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid limit");
}

#[tokio::test]
async fn test_history_without_store_is_empty() {
    let app = app(dispatcher());
    let (status, body) = call(&app, get("/api/devops/history?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_tool_status_with_no_tools() {
    let app = app(dispatcher());
    let (status, body) = call(&app, get("/api/devops/tools/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = app(dispatcher());
    let response = app.oneshot(get("/api/devops/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = app(dispatcher());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/devops/execute")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_serve_answers_health_over_tcp() {
    let temp = TempDir::new().unwrap();
    let mut config = DevOpsConfig::default();
    config.server.bind = "127.0.0.1:0".to_string();
    config.history.dir = temp.path().to_path_buf();

    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move { server::serve_with_ready_notifier(&config, tx).await });
    let addr = rx.await.unwrap();

    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["status"], "healthy");

    handle.abort();
}
