use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::CountResponse;
use crate::api::schemas::notifications::{
    CreateNotificationRequest, ListNotificationsQuery, MarkAllReadResponse, NotificationResponse,
};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

/// # Errors
/// Returns `AppError::AuthError` if the caller is not authenticated.
pub async fn list_notifications(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<impl IntoResponse> {
    let notifications =
        state.notification_service.list(auth_user.user_id, query.unread_only, query.limit).await?;
    Ok(Json(notifications.into_iter().map(NotificationResponse::from).collect::<Vec<_>>()))
}

/// Stores a notification for another user. Admin only.
///
/// # Errors
/// Returns `AppError::Forbidden` unless the caller is an admin.
/// Returns `AppError::BadRequest` for an empty title or invalid action URL.
/// Returns `AppError::InvalidTarget` if the recipient does not exist.
pub async fn create_notification(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse> {
    let notification = state.notification_service.create(auth_user.user_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(NotificationResponse::from(notification))))
}

/// # Errors
/// Returns `AppError::NotFound` if the notification is not the caller's.
pub async fn mark_read(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.notification_service.mark_read(notification_id, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
/// Returns `AppError::AuthError` if the caller is not authenticated.
pub async fn mark_all_read(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let updated = state.notification_service.mark_all_read(auth_user.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// # Errors
/// Returns `AppError::NotFound` if the notification is not the caller's.
pub async fn delete_notification(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.notification_service.delete(notification_id, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
/// Returns `AppError::AuthError` if the caller is not authenticated.
pub async fn unread_count(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let count = state.notification_service.unread_count(auth_user.user_id).await?;
    Ok(Json(CountResponse { count }))
}
