use std::sync::Arc;

use axum::{extract::Extension, Json};
use tracing::info;

use crate::models::chat::{ChatRequest, ChatResponse, InitializeRequest};
use crate::services::ConversationManager;
use crate::utils::error::ApiError;

/// POST /api/initialize — allocate a session and return the greeting. The
/// body is optional; profile hints steer the greeting when present.
pub async fn initialize_handler(
    Extension(manager): Extension<Arc<ConversationManager>>,
    body: Option<Json<InitializeRequest>>,
) -> Result<Json<ChatResponse>, ApiError> {
    let hints = body.map(|Json(req)| req).unwrap_or(InitializeRequest {
        experience_tier: None,
        authenticated: false,
    });

    info!(
        "Initialize request: tier={:?}, authenticated={}",
        hints.experience_tier, hints.authenticated
    );

    let (session_id, response) = manager
        .initialize(hints.experience_tier.as_deref(), hints.authenticated)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to initialize agent: {}", e)))?;

    Ok(Json(ChatResponse {
        session_id,
        response,
    }))
}

/// POST /api/chat — run one conversation turn. Unknown or missing session
/// ids get a fresh session rather than an error.
pub async fn chat_handler(
    Extension(manager): Extension<Arc<ConversationManager>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    info!(
        "Chat request: session={:?}, message_len={}",
        request.session_id,
        request.message.len()
    );

    let (session_id, response) = manager
        .process_user_input(request.session_id, &request.message)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to process message: {}", e)))?;

    Ok(Json(ChatResponse {
        session_id,
        response,
    }))
}
