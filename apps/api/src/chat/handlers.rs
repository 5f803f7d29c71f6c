use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chat::{self, ChatTurn};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// POST /api/v1/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }

    info!("Chat message with {} prior turns", req.history.len());
    let reply = chat::reply(state.model.as_ref(), &req.history, message).await?;
    Ok(Json(ChatResponse { reply }))
}
