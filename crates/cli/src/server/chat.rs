use super::{ApiError, ServerState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use docqa_search::SearchError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_user_id() -> String {
    "guest".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

pub(super) async fn chat(
    State(state): State<ServerState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let language = request
        .language
        .as_deref()
        .unwrap_or(&state.default_language);
    log::info!(
        "Chat message from {} (language {language})",
        request.user_id
    );

    match state.qa.ask(&request.message, language).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(err) => {
            log::error!("Chat request from {} failed: {err}", request.user_id);
            Err(error_response(err))
        }
    }
}

fn error_response(err: SearchError) -> ApiError {
    let status = match &err {
        SearchError::EmptyQuery => StatusCode::BAD_REQUEST,
        SearchError::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::Generation(_) => StatusCode::BAD_GATEWAY,
        SearchError::InvalidK(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::new(status, err.to_string())
}
