use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::domain::badge::Category;
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

/// Badge counts for every category the caller's role exposes.
///
/// # Errors
/// Returns `AppError::NotFound` if the caller's user row does not exist.
pub async fn category_counts(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let counts = state.badge_service.counts_for_user(auth_user.user_id).await?;
    Ok(Json(counts))
}

/// Records that the caller opened a tab and returns the refreshed counts.
///
/// # Errors
/// Returns `AppError::BadRequest` for unknown categories and for `messages`/`notifications`.
pub async fn mark_viewed(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse> {
    let category: Category = category.parse().map_err(AppError::BadRequest)?;
    state.badge_service.mark_category_viewed(auth_user.user_id, category, None).await?;
    let counts = state.badge_service.counts_for_user(auth_user.user_id).await?;
    Ok(Json(counts))
}
