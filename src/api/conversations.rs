use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::conversations::{
    ConversationSummaryResponse, CreateConversationRequest, StartConversationResponse,
};
use crate::api::schemas::messages::{MessageResponse, SystemMessageRequest};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Lists the caller's conversations, most recent activity first.
///
/// # Errors
/// Returns `AppError::AuthError` if the caller is not authenticated.
pub async fn list_conversations(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let summaries = state.conversation_service.list_conversations(auth_user.user_id).await?;
    Ok(Json(summaries.into_iter().map(ConversationSummaryResponse::from).collect::<Vec<_>>()))
}

/// Starts a conversation, or returns the existing one for this pair.
///
/// Responds `201 Created` when a conversation was created and `200 OK` otherwise.
///
/// # Errors
/// Returns `AppError::InvalidTarget` for unknown users or self-conversations.
/// Returns `AppError::RecipientUnavailable` if the counterpart deleted their account.
pub async fn create_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse> {
    let started = state
        .conversation_service
        .get_or_create_conversation(auth_user.user_id, payload.other_user_id, &payload.initial_message)
        .await?;

    let status = if started.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(StartConversationResponse::from(started))))
}

/// Returns the conversation's messages and marks the caller's incoming ones as read.
///
/// # Errors
/// Returns `AppError::Forbidden` if the caller is not a participant.
pub async fn list_messages(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let messages = state.conversation_service.list_messages(conversation_id, auth_user.user_id).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect::<Vec<_>>()))
}

/// # Errors
/// Returns `AppError::Forbidden` unless the caller is an admin.
/// Returns `AppError::NotFound` if the conversation does not exist.
pub async fn post_system_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Json(payload): Json<SystemMessageRequest>,
) -> Result<impl IntoResponse> {
    let message =
        state.conversation_service.post_system_message(auth_user.user_id, conversation_id, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}
