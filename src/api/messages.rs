use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::CountResponse;
use crate::api::schemas::messages::{MessageResponse, SendMessageRequest};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Appends a message to a conversation the caller participates in.
///
/// # Errors
/// Returns `AppError::Forbidden` if `sender_id` is not the caller or the caller is not a participant.
/// Returns `AppError::RecipientUnavailable` if the counterpart deleted their account.
/// Returns `AppError::BadRequest` if the content is empty or too long.
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    if payload.sender_id != auth_user.user_id {
        return Err(AppError::Forbidden);
    }

    let message =
        state.conversation_service.send_message(payload.conversation_id, auth_user.user_id, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// # Errors
/// Returns `AppError::Forbidden` unless the caller sent the message.
pub async fn delete_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.conversation_service.delete_message(message_id, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
/// Returns `AppError::AuthError` if the caller is not authenticated.
pub async fn unread_count(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let count = state.conversation_service.unread_count(auth_user.user_id).await?;
    Ok(Json(CountResponse { count }))
}
