#![allow(clippy::result_large_err)] // Server setup returns AppError for consistent diagnostics.

//! Thin HTTP shell over [`CommandDispatcher`] for the web console.

use crate::core::config::{DevOpsConfig, ServerConfig};
use crate::core::entities::CommandResult;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::{CommandDispatcher, HistoryStore};
use axum::{
    body::{Body, Bytes},
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, Method, Response, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower::util::MapResponseLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

const DEFAULT_HISTORY_LIMIT: usize = 20;

/// State shared across API requests.
struct ApiState {
    dispatcher: Arc<CommandDispatcher>,
    /// Cancelled on shutdown; every request runs on a child token.
    shutdown: CancellationToken,
}

/// Envelope used by every endpoint.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ApiResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn data<T: Serialize>(payload: &T) -> Result<Self, ApiRejection> {
        let data = serde_json::to_value(payload).map_err(|err| {
            ApiRejection::internal(format!("failed to encode response: {}", err))
        })?;
        Ok(ApiResponse {
            data: Some(data),
            ..Default::default()
        })
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    command: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

/// Build the API router around `dispatcher`.
pub fn router(dispatcher: CommandDispatcher, settings: &ServerConfig) -> Result<Router, AppError> {
    router_with_shutdown(dispatcher, settings, CancellationToken::new())
}

fn router_with_shutdown(
    dispatcher: CommandDispatcher,
    settings: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<Router, AppError> {
    let state = Arc::new(ApiState {
        dispatcher: Arc::new(dispatcher),
        shutdown,
    });
    let cors = cors_layer(&settings.cors_origins)?;

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/api/devops/commands", get(handle_commands))
        .route("/api/devops/execute", post(handle_execute))
        .route("/api/devops/history", get(handle_history))
        .route("/api/devops/tools/status", get(handle_tool_status))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(settings.body_limit_bytes))
        .layer(MapResponseLayer::new(|mut response: Response<Body>| {
            if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
                let body = json!({ "error": "payload too large" }).to_string();
                *response.body_mut() = Body::from(body);
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            response
        }))
        .layer(cors))
}

/// Start the API listener and block until it shuts down.
pub async fn serve(config: &DevOpsConfig) -> Result<(), AppError> {
    serve_internal(config, None).await
}

/// Start the API listener and report the bound address once known (test helper).
pub async fn serve_with_ready_notifier(
    config: &DevOpsConfig,
    ready_notifier: oneshot::Sender<SocketAddr>,
) -> Result<(), AppError> {
    serve_internal(config, Some(ready_notifier)).await
}

async fn serve_internal(
    config: &DevOpsConfig,
    ready_notifier: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), AppError> {
    let bind_addr: SocketAddr = config.server.bind.parse().map_err(|err| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("invalid bind address {}: {}", config.server.bind, err),
        )
        .with_code("CFG-004")
    })?;

    let shutdown = CancellationToken::new();
    let dispatcher = CommandDispatcher::from_config(config)?;
    let app = router_with_shutdown(dispatcher, &config.server, shutdown.clone())?;

    let listener = TcpListener::bind(bind_addr).await.map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to bind API listener {}: {}", bind_addr, err),
        )
    })?;
    let local_addr = listener.local_addr().map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to determine API listener address: {}", err),
        )
    })?;
    if let Some(tx) = ready_notifier {
        let _ = tx.send(local_addr);
    }
    info!("DevOps API listening on {}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("API server terminated: {}", err),
            )
        })?;

    info!("DevOps API stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM and cancel in-flight commands.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, AppError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(300));

    if origins.iter().any(|origin| origin == "*") {
        return Ok(layer.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!("invalid CORS origin: {}", origin),
                )
                .with_code("CFG-004")
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

async fn handle_health() -> Json<ApiResponse> {
    Json(ApiResponse {
        data: Some(json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
        })),
        ..Default::default()
    })
}

async fn handle_commands(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ApiResponse>, ApiRejection> {
    Ok(Json(ApiResponse::data(&state.dispatcher.list_commands())?))
}

async fn handle_execute(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<ApiResponse>, ApiRejection> {
    let request: ExecuteRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiRejection::bad_request("Invalid request body"))?;

    // Run detached so a dropped connection cancels the command instead of
    // abandoning it before its history record is written.
    let cancel = state.shutdown.child_token();
    let guard = cancel.clone().drop_guard();
    let dispatcher = state.dispatcher.clone();
    let result: CommandResult = tokio::spawn(async move {
        dispatcher
            .execute_with_cancel(&request.command, &request.args, &cancel)
            .await
    })
    .await
    .map_err(|err| ApiRejection::internal(format!("Failed to execute command: {}", err)))?;
    guard.disarm();

    Ok(Json(ApiResponse::data(&result)?))
}

async fn handle_history(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<ApiResponse>, ApiRejection> {
    let Query(query) = query.map_err(|_| ApiRejection::bad_request("Invalid limit"))?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    let Some(store) = state.dispatcher.history().cloned() else {
        return Ok(Json(ApiResponse::data(&Vec::<CommandResult>::new())?));
    };
    let records = list_history(store, limit).await.map_err(|err| {
        warn!(error = %err, "failed to read command history");
        ApiRejection::internal("Failed to get command history")
    })?;
    Ok(Json(ApiResponse::data(&records)?))
}

async fn list_history(store: HistoryStore, limit: usize) -> Result<Vec<CommandResult>, AppError> {
    tokio::task::spawn_blocking(move || store.list(limit))
        .await
        .map_err(|err| {
            AppError::new(
                ErrorCategory::InternalError,
                format!("history task failed: {}", err),
            )
        })?
}

async fn handle_tool_status(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ApiResponse>, ApiRejection> {
    let cancel = state.shutdown.child_token();
    let statuses = state
        .dispatcher
        .probe()
        .check_availability_with_cancel(&cancel)
        .await;
    Ok(Json(ApiResponse::data(&statuses)?))
}

#[derive(Debug)]
struct ApiRejection {
    status: StatusCode,
    message: String,
}

impl ApiRejection {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiRejection {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiRejection {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> axum::response::Response {
        let body = ApiResponse {
            error: Some(self.message),
            ..Default::default()
        };
        (self.status, Json(body)).into_response()
    }
}
