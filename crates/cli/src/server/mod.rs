//! HTTP surface: direct chat, health and the Meta messaging webhooks.

mod chat;
mod webhook;

use crate::channels::MessageSender;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use docqa_indexer::WatcherHealth;
use docqa_search::QaService;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub use chat::{ChatRequest, ChatResponse};

#[derive(Clone)]
pub struct ServerState {
    pub qa: QaService,
    pub sender: Arc<dyn MessageSender>,
    pub verify_token: Option<String>,
    pub default_language: String,
    /// Present when the source folder is being watched
    pub watcher_health: Option<watch::Receiver<WatcherHealth>>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat::chat))
        .route(
            "/whatsapp/webhook",
            get(webhook::verify).post(webhook::whatsapp),
        )
        .route(
            "/instagram/webhook",
            get(webhook::verify).post(webhook::instagram),
        )
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health(State(state): State<ServerState>) -> Json<serde_json::Value> {
    match &state.watcher_health {
        Some(rx) => {
            let watcher = rx.borrow().clone();
            Json(json!({ "status": "ok", "watcher": watcher }))
        }
        None => Json(json!({ "status": "ok" })),
    }
}

/// Error body shaped as `{"detail": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
