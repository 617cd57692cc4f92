use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::stream::StreamExt;
use serde_json::{json, Value};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, warn};

use parcelscan_core::{CaptureError, RecognitionError, ScanError, ScanId};
use parcelscan_media::media_router;
use parcelscan_workflow::ScanController;

/// Shared application state for API handlers.
pub struct AppState {
    pub controller: ScanController,
}

/// Build the Axum router with all API routes.
///
/// When `asset_dir` is set, stored images are served under `/assets`.
pub fn build_router(state: Arc<AppState>, asset_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/state", get(get_state))
        .route("/api/history", get(get_history))
        .route("/api/capture", post(capture))
        .route("/api/retake", post(retake))
        .route("/api/history/:id/select", post(select_history))
        .route("/api/events", get(ws_handler))
        .with_state(state);

    match asset_dir {
        Some(dir) => app.nest("/assets", media_router(dir)),
        None => app,
    }
}

/// JSON error body with the message a user should see.
enum ApiError {
    Scan(ScanError),
    Internal(String),
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        Self::Scan(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Scan(err) => err,
            ApiError::Internal(detail) => {
                let body = json!({
                    "error": "internal",
                    "message": "Something went wrong. Please try again.",
                    "detail": detail,
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };
        let (status, code) = match &err {
            ScanError::Busy => (StatusCode::CONFLICT, "busy"),
            ScanError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ScanError::Superseded => (StatusCode::GONE, "superseded"),
            ScanError::Duplicate(_) => (StatusCode::INTERNAL_SERVER_ERROR, "duplicate_scan"),
            ScanError::Capture(CaptureError::PermissionDenied) => {
                (StatusCode::FORBIDDEN, "capture_failed")
            }
            ScanError::Capture(CaptureError::Timeout(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, "capture_failed")
            }
            ScanError::Capture(_) => (StatusCode::SERVICE_UNAVAILABLE, "capture_failed"),
            ScanError::Recognition(RecognitionError::Timeout(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, "scan_failed")
            }
            ScanError::Recognition(_) => (StatusCode::UNPROCESSABLE_ENTITY, "scan_failed"),
        };
        let body = json!({
            "error": code,
            "message": err.user_message(),
            "detail": err.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "parcelscan",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// What the scanner screen shows right now.
async fn get_state(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.controller.snapshot().await))
}

/// Full history, most recent first.
async fn get_history(State(state): State<Arc<AppState>>) -> Json<Value> {
    let history = state.controller.history().await;
    Json(json!({ "total": history.len(), "scans": history }))
}

/// Run one capture cycle and return the merged record.
///
/// The cycle runs on its own task so a client that hangs up mid-scan does
/// not leave the controller stuck in a half-finished cycle.
async fn capture(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let controller = state.controller.clone();
    let record = tokio::spawn(async move { controller.start_capture().await })
        .await
        .map_err(|e| {
            error!(error = %e, "Capture task failed");
            ApiError::Internal(e.to_string())
        })??;
    Ok(Json(json!(record)))
}

async fn retake(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.controller.retake().await;
    Json(json!(state.controller.snapshot().await))
}

async fn select_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .controller
        .select_history_entry(&ScanId::from(id))
        .await?;
    Ok(Json(json!(record)))
}

/// WebSocket feed of scan events.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut stream = BroadcastStream::new(state.controller.subscribe());

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(event) => {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    debug!("Event socket closed by client");
                    break;
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "Event socket lagging; events dropped");
            }
        }
    }
}
